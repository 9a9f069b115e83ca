//! Domain model types shared by the runtime, the persistence layer, and the
//! web layer. These are plain value types; persistence conversions live in
//! `database::repositories`, entity shapes live in `entities`.

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::errors::{AppResult, RuntimeError};

/// Channel lifecycle state. Only the transitions in [`ChannelState::can_transition_to`]
/// are legal; everything else fails with `RuntimeError::InvalidState`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum ChannelState {
    Idle,
    Starting,
    Streaming,
    Stopping,
    Error,
}

impl ChannelState {
    pub fn can_transition_to(self, to: ChannelState) -> bool {
        use ChannelState::*;
        matches!(
            (self, to),
            (Idle, Starting)
                | (Starting, Streaming)
                | (Starting, Error)
                | (Starting, Idle)
                | (Streaming, Stopping)
                | (Streaming, Error)
                | (Stopping, Idle)
                | (Stopping, Error)
                | (Error, Idle)
                | (Error, Starting)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub video_bitrate_kbps: u32,
    pub audio_bitrate_kbps: u32,
    pub resolution: String,
    pub fps: u32,
    pub segment_duration: u32,
    pub auto_start: bool,
    pub use_dynamic_playlist: bool,
    pub include_bumpers: bool,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            video_bitrate_kbps: 4000,
            audio_bitrate_kbps: 192,
            resolution: "1920x1080".to_string(),
            fps: 30,
            segment_duration: crate::config::defaults::DEFAULT_SEGMENT_DURATION,
            auto_start: false,
            use_dynamic_playlist: false,
            include_bumpers: crate::config::defaults::DEFAULT_INCLUDE_BUMPERS,
        }
    }
}

/// Runtime metadata tracked in-memory (and periodically snapshotted) per channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelMetadata {
    pub current_index: usize,
    pub viewer_count: u32,
    pub started_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl Default for ChannelMetadata {
    fn default() -> Self {
        Self {
            current_index: 0,
            viewer_count: 0,
            started_at: None,
            last_error: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    pub id: Uuid,
    pub slug: String,
    pub name: String,
    pub output_dir: String,
    pub config: ChannelConfig,
    pub state: ChannelState,
    pub metadata: ChannelMetadata,
}

impl Channel {
    pub fn new(slug: impl Into<String>, name: impl Into<String>, output_dir: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            slug: slug.into(),
            name: name.into(),
            output_dir: output_dir.into(),
            config: ChannelConfig::default(),
            state: ChannelState::Idle,
            metadata: ChannelMetadata::default(),
        }
    }

    /// Fails with `InvalidState` unless the edge is legal.
    pub fn transition_to(&mut self, to: ChannelState) -> AppResult<()> {
        if !self.state.can_transition_to(to) {
            return Err(RuntimeError::invalid_state(
                self.state.to_string(),
                to.to_string(),
            ));
        }
        if to == ChannelState::Streaming {
            self.metadata.started_at = Some(Utc::now());
        }
        self.state = to;
        Ok(())
    }

    pub fn update_current_index(&mut self, index: usize) {
        self.metadata.current_index = index;
    }

    pub fn increment_viewer_count(&mut self) {
        self.metadata.viewer_count += 1;
    }

    /// Clamped at zero; never underflows.
    pub fn decrement_viewer_count(&mut self) {
        self.metadata.viewer_count = self.metadata.viewer_count.saturating_sub(1);
    }

    /// Atomically moves the channel to `ERROR`, recording `msg`.
    pub fn set_error(&mut self, msg: impl Into<String>) {
        self.metadata.last_error = Some(msg.into());
        self.state = ChannelState::Error;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaFile {
    pub id: Uuid,
    pub path: String,
    pub filename: String,
    pub duration_seconds: f64,
    pub file_size: u64,
    pub show_name: Option<String>,
    pub season: Option<u32>,
    pub episode: Option<u32>,
    pub title: Option<String>,
}

impl MediaFile {
    /// Human-facing title for bumper/EPG text: `title`, falling back to `filename`.
    pub fn display_title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.filename)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum BucketType {
    Global,
    ChannelSpecific,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bucket {
    pub id: Uuid,
    pub name: String,
    pub bucket_type: BucketType,
    /// Ordered member media ids.
    pub media_ids: Vec<Uuid>,
}

/// A channel's association with a bucket, ranked by `priority` (higher wins).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelBucket {
    pub channel_id: Uuid,
    pub bucket_id: Uuid,
    pub priority: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PlaybackMode {
    Sequential,
    Random,
    Shuffle,
}

/// A weekday set as used by [`ScheduleBlock::day_of_week`]; empty means "every day".
/// 0 = Sunday, matching the external-interface convention.
pub type DayOfWeekSet = Vec<u8>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleBlock {
    pub id: Uuid,
    pub channel_id: Uuid,
    pub day_of_week: DayOfWeekSet,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub bucket_id: Uuid,
    pub playback_mode: PlaybackMode,
    pub priority: i32,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
}

impl ScheduleBlock {
    /// Active iff enabled, the weekday matches (or the set is empty), and
    /// `now`'s local time of day falls in `[start_time, end_time)`.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        if !self.enabled {
            return false;
        }
        let weekday = now.format("%w").to_string().parse::<u8>().unwrap_or(0);
        if !self.day_of_week.is_empty() && !self.day_of_week.contains(&weekday) {
            return false;
        }
        let time = now.time();
        time >= self.start_time && time < self.end_time
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.end_time <= self.start_time {
            return Err(RuntimeError::validation(
                "schedule block endTime must be after startTime",
            ));
        }
        if self.day_of_week.iter().any(|d| *d > 6) {
            return Err(RuntimeError::validation("dayOfWeek entries must be 0..=6"));
        }
        if self.priority < 1 {
            return Err(RuntimeError::validation("priority must be >= 1"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BucketProgression {
    pub channel_id: Uuid,
    pub bucket_id: Uuid,
    pub last_played_media_id: Option<Uuid>,
    pub position_in_bucket: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SessionKind {
    Started,
    Resumed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SessionTrigger {
    Manual,
    Automatic,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackSession {
    pub id: Uuid,
    pub channel_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub kind: SessionKind,
    pub trigger: SessionTrigger,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpgProgram {
    pub id: Uuid,
    pub channel_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub title: String,
    pub description: Option<String>,
    pub category: Option<String>,
    pub episode_num: Option<String>,
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) [{}]", self.name, self.slug, self.state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legal_state_transitions() {
        let mut channel = Channel::new("news", "News", "/data/news");
        assert!(channel.transition_to(ChannelState::Starting).is_ok());
        assert!(channel.transition_to(ChannelState::Streaming).is_ok());
        assert!(channel.metadata.started_at.is_some());
        assert!(channel.transition_to(ChannelState::Stopping).is_ok());
        assert!(channel.transition_to(ChannelState::Idle).is_ok());
    }

    #[test]
    fn illegal_transition_rejected() {
        let mut channel = Channel::new("news", "News", "/data/news");
        assert!(channel.transition_to(ChannelState::Streaming).is_err());
    }

    #[test]
    fn viewer_count_clamps_at_zero() {
        let mut channel = Channel::new("news", "News", "/data/news");
        channel.decrement_viewer_count();
        assert_eq!(channel.metadata.viewer_count, 0);
        channel.increment_viewer_count();
        channel.decrement_viewer_count();
        channel.decrement_viewer_count();
        assert_eq!(channel.metadata.viewer_count, 0);
    }

    #[test]
    fn set_error_moves_to_error_state() {
        let mut channel = Channel::new("news", "News", "/data/news");
        channel.set_error("boom");
        assert_eq!(channel.state, ChannelState::Error);
        assert_eq!(channel.metadata.last_error.as_deref(), Some("boom"));
    }
}
