//! EPG Generator: derives a program guide from the same schedule math the
//! runtime uses to pick what's playing, cached per channel with a monotonic
//! invalidation version.

mod xmltv;

pub use xmltv::export_xmltv;

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::errors::AppResult;
use crate::models::{Channel, EpgProgram, MediaFile};
use crate::observability::RuntimeObservability;
use crate::playlist::{PlaylistResolver, ResolveContext};
use crate::schedule::ScheduleTimeline;

const DEFAULT_HORIZON_HOURS: i64 = 24;

struct CacheEntry {
    version: u64,
    programs: Vec<EpgProgram>,
}

pub struct EpgGenerator {
    cache: Mutex<HashMap<Uuid, CacheEntry>>,
    versions: Mutex<HashMap<Uuid, u64>>,
}

impl Default for EpgGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl EpgGenerator {
    pub fn new() -> Self {
        Self {
            cache: Mutex::new(HashMap::new()),
            versions: Mutex::new(HashMap::new()),
        }
    }

    /// Bumps the invalidation version for a channel so the next read recomputes.
    pub fn invalidate(&self, channel_id: Uuid) {
        let mut versions = self.versions.lock().unwrap();
        *versions.entry(channel_id).or_insert(0) += 1;
    }

    fn current_version(&self, channel_id: Uuid) -> u64 {
        *self.versions.lock().unwrap().get(&channel_id).unwrap_or(&0)
    }

    /// Programs covering the next [`DEFAULT_HORIZON_HOURS`] from `now`, anchored
    /// to `schedule_start` and walking cumulative media durations. Re-consults
    /// `playlist_resolver` at every schedule-block boundary crossed along the
    /// way, so a block that takes over partway through the horizon shows up
    /// in the guide instead of being masked by whatever was resolved at `now`.
    /// Cached until `invalidate` is called for this channel.
    pub async fn generate_programs(
        &self,
        channel: &Channel,
        schedule_start: DateTime<Utc>,
        playlist_resolver: &PlaylistResolver,
        observability: Option<&RuntimeObservability>,
    ) -> AppResult<Vec<EpgProgram>> {
        let version = self.current_version(channel.id);

        {
            let cache = self.cache.lock().unwrap();
            if let Some(entry) = cache.get(&channel.id) {
                if entry.version == version {
                    if let Some(obs) = observability {
                        obs.epg_cache_hits.add(1, &[]);
                    }
                    return Ok(entry.programs.clone());
                }
            }
        }

        if let Some(obs) = observability {
            obs.epg_cache_misses.add(1, &[]);
        }

        let programs = walk_programs(channel, schedule_start, playlist_resolver, Utc::now()).await?;

        self.cache.lock().unwrap().insert(
            channel.id,
            CacheEntry {
                version,
                programs: programs.clone(),
            },
        );
        Ok(programs)
    }

    pub fn get_current_and_next(&self, channel_id: Uuid, now: DateTime<Utc>) -> (Option<EpgProgram>, Option<EpgProgram>) {
        let cache = self.cache.lock().unwrap();
        let Some(entry) = cache.get(&channel_id) else {
            return (None, None);
        };
        let current_pos = entry.programs.iter().position(|p| p.start_time <= now && now < p.end_time);
        match current_pos {
            Some(index) => (
                entry.programs.get(index).cloned(),
                entry.programs.get(index + 1).cloned(),
            ),
            None => (None, entry.programs.first().cloned()),
        }
    }

    /// `(fileIndex, seekSeconds)` implied by the currently-airing program, so
    /// the runtime can pick "what the guide says is on now".
    pub fn get_current_playback_position(
        &self,
        channel_id: Uuid,
        media: &[MediaFile],
        now: DateTime<Utc>,
    ) -> Option<(usize, f64)> {
        let (current, _) = self.get_current_and_next(channel_id, now);
        let current = current?;
        let index = media.iter().position(|m| m.display_title() == current.title)?;
        let seek = (now - current.start_time).num_milliseconds() as f64 / 1000.0;
        Some((index, seek.max(0.0)))
    }

    /// Resync policy (§4.7): EPG is authoritative. If the guide's current
    /// program title matches a file in `media`, prefer that file; otherwise
    /// keep the timeline's answer.
    pub fn resync_with_timeline(
        &self,
        channel_id: Uuid,
        media: &[MediaFile],
        timeline_answer: Option<(usize, f64)>,
        now: DateTime<Utc>,
    ) -> Option<(usize, f64)> {
        match self.get_current_playback_position(channel_id, media, now) {
            Some(epg_answer) => Some(epg_answer),
            None => timeline_answer,
        }
    }
}

/// Walks forward from `now` to the horizon, re-resolving the playlist
/// whenever `next_block_boundary` says the active schedule block could have
/// changed. Each segment between boundaries is filled by [`programs_until`].
async fn walk_programs(
    channel: &Channel,
    schedule_start: DateTime<Utc>,
    playlist_resolver: &PlaylistResolver,
    now: DateTime<Utc>,
) -> AppResult<Vec<EpgProgram>> {
    let horizon_end = now + Duration::hours(DEFAULT_HORIZON_HOURS);

    let mut media = playlist_resolver
        .resolve_media(channel, &ResolveContext { current_time: now, current_index: None })
        .await?;
    if media.is_empty() {
        return Ok(Vec::new());
    }
    let Some((start_index, seek)) = ScheduleTimeline::position_at(schedule_start, now, &media) else {
        return Ok(Vec::new());
    };

    let mut cursor = now - Duration::milliseconds((seek * 1000.0) as i64);
    let mut index = start_index;
    let mut programs = Vec::new();

    while cursor < horizon_end {
        let boundary = playlist_resolver.next_block_boundary(channel.id, cursor).await?;
        let stop_at = boundary.map_or(horizon_end, |b| b.min(horizon_end));

        let (mut segment, new_cursor) = programs_until(channel.id, &media, index, cursor, stop_at);
        programs.append(&mut segment);
        if new_cursor <= cursor {
            break;
        }
        cursor = new_cursor;
        if cursor >= horizon_end {
            break;
        }

        media = playlist_resolver
            .resolve_media(channel, &ResolveContext { current_time: cursor, current_index: None })
            .await?;
        if media.is_empty() {
            break;
        }
        index = 0;
    }
    Ok(programs)
}

/// Emits programs for one fixed `media` list from `start_index`/`cursor`
/// until `stop_at`, clipping the final program's `end_time` to `stop_at`
/// rather than overrunning it. Returns the emitted programs and the cursor
/// actually reached (equal to `stop_at` unless `media` is empty). Pure and
/// synchronous so the boundary-clipping behavior is unit-testable without a
/// database.
fn programs_until(
    channel_id: Uuid,
    media: &[MediaFile],
    start_index: usize,
    cursor: DateTime<Utc>,
    stop_at: DateTime<Utc>,
) -> (Vec<EpgProgram>, DateTime<Utc>) {
    let mut programs = Vec::new();
    let mut cursor = cursor;
    if media.is_empty() {
        return (programs, cursor);
    }
    let mut index = start_index;
    while cursor < stop_at {
        let file = &media[index % media.len()];
        let duration = Duration::milliseconds((file.duration_seconds * 1000.0) as i64);
        let end = (cursor + duration).min(stop_at);
        programs.push(EpgProgram {
            id: Uuid::new_v4(),
            channel_id,
            start_time: cursor,
            end_time: end,
            title: file.display_title().to_string(),
            description: None,
            category: None,
            episode_num: None,
        });
        cursor = end;
        index += 1;
    }
    (programs, cursor)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(title: &str, duration_seconds: f64) -> MediaFile {
        MediaFile {
            id: Uuid::new_v4(),
            path: format!("{title}.mp4"),
            filename: format!("{title}.mp4"),
            duration_seconds,
            file_size: 0,
            show_name: None,
            season: None,
            episode: None,
            title: Some(title.to_string()),
        }
    }

    #[test]
    fn empty_media_yields_no_programs() {
        let channel_id = Uuid::new_v4();
        let now = Utc::now();
        let (programs, cursor) = programs_until(channel_id, &[], 0, now, now + Duration::hours(24));
        assert!(programs.is_empty());
        assert_eq!(cursor, now);
    }

    #[test]
    fn fills_the_requested_span_by_rotating_through_media() {
        let channel_id = Uuid::new_v4();
        let now = Utc::now();
        let media = vec![file("Episode A", 1800.0), file("Episode B", 1800.0)];
        let stop_at = now + Duration::hours(DEFAULT_HORIZON_HOURS);

        let (programs, cursor) = programs_until(channel_id, &media, 0, now, stop_at);
        assert!(!programs.is_empty());
        assert_eq!(cursor, stop_at);
        assert_eq!(programs.last().unwrap().end_time, stop_at);
    }

    #[test]
    fn clips_the_last_program_to_the_boundary() {
        let channel_id = Uuid::new_v4();
        let now = Utc::now();
        let media = vec![file("Episode A", 1800.0), file("Episode B", 1800.0)];
        let stop_at = now + Duration::minutes(45);

        let (programs, cursor) = programs_until(channel_id, &media, 0, now, stop_at);
        assert_eq!(cursor, stop_at);
        let last = programs.last().unwrap();
        assert_eq!(last.end_time, stop_at);
        assert!(last.end_time - last.start_time < Duration::minutes(30));
    }
}
