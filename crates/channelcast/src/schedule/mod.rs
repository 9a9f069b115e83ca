//! Schedule Timeline: the persistent wall-clock anchor that maps `(now, media)`
//! to `(fileIndex, seekSeconds)`. The epoch is never advanced by pause/resume —
//! time keeps flowing like a broadcaster's wall clock.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::database::repositories::schedule_start_time::ScheduleStartTimeRepository;
use crate::errors::AppResult;
use crate::models::MediaFile;

pub struct ScheduleTimeline {
    repo: Arc<ScheduleStartTimeRepository>,
}

impl ScheduleTimeline {
    pub fn new(repo: Arc<ScheduleStartTimeRepository>) -> Self {
        Self { repo }
    }

    /// Idempotent: sets `scheduleStartTime = now` if absent.
    pub async fn initialize(&self, channel_id: Uuid) -> AppResult<DateTime<Utc>> {
        Ok(self.repo.initialize(channel_id).await?)
    }

    pub async fn has(&self, channel_id: Uuid) -> AppResult<bool> {
        Ok(self.repo.get(channel_id).await?.is_some())
    }

    pub async fn get(&self, channel_id: Uuid) -> AppResult<Option<DateTime<Utc>>> {
        Ok(self.repo.get(channel_id).await?)
    }

    /// Explicit operator override of the schedule anchor (rewind/fast-forward).
    pub async fn set(&self, channel_id: Uuid, started_at: DateTime<Utc>) -> AppResult<()> {
        Ok(self.repo.set(channel_id, started_at).await?)
    }

    /// `(fileIndex, seekSeconds)` for the given media list at `now`, or `None`
    /// if media is empty, total duration is <= 0, or no start time is set.
    pub async fn current_position(
        &self,
        channel_id: Uuid,
        media: &[MediaFile],
    ) -> AppResult<Option<(usize, f64)>> {
        let Some(start_time) = self.repo.get(channel_id).await? else {
            return Ok(None);
        };
        Ok(Self::position_at(start_time, Utc::now(), media))
    }

    /// Pure function of the algorithm, split out for deterministic unit testing.
    pub fn position_at(
        start_time: DateTime<Utc>,
        now: DateTime<Utc>,
        media: &[MediaFile],
    ) -> Option<(usize, f64)> {
        if media.is_empty() {
            return None;
        }
        let total: f64 = media.iter().map(|m| m.duration_seconds).sum();
        if total <= 0.0 {
            return None;
        }
        let elapsed = (now - start_time).num_milliseconds() as f64 / 1000.0;
        let elapsed = if elapsed < 0.0 { 0.0 } else { elapsed };
        let pos = elapsed.rem_euclid(total);

        let mut cumulative = 0.0;
        for (index, file) in media.iter().enumerate() {
            let next = cumulative + file.duration_seconds;
            if pos < next {
                return Some((index, pos - cumulative));
            }
            cumulative = next;
        }
        // Floating point rounding can leave `pos` equal to `total`; land on the last file.
        Some((media.len() - 1, media.last().unwrap().duration_seconds))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn media(durations: &[f64]) -> Vec<MediaFile> {
        durations
            .iter()
            .map(|d| MediaFile {
                id: Uuid::new_v4(),
                path: "x".to_string(),
                filename: "x".to_string(),
                duration_seconds: *d,
                file_size: 0,
                show_name: None,
                season: None,
                episode: None,
                title: None,
            })
            .collect()
    }

    #[test]
    fn empty_media_returns_none() {
        let start = Utc::now();
        assert_eq!(ScheduleTimeline::position_at(start, start, &[]), None);
    }

    #[test]
    fn position_lands_in_first_file_at_epoch() {
        let start = Utc::now();
        let media = media(&[100.0, 200.0]);
        let (index, seek) = ScheduleTimeline::position_at(start, start, &media).unwrap();
        assert_eq!(index, 0);
        assert_eq!(seek, 0.0);
    }

    #[test]
    fn position_wraps_modulo_total_duration() {
        let start = Utc::now();
        let media = media(&[100.0, 200.0]);
        // total = 300; elapsed = 350 -> pos = 50 -> still file 0
        let now = start + Duration::seconds(350);
        let (index, seek) = ScheduleTimeline::position_at(start, now, &media).unwrap();
        assert_eq!(index, 0);
        assert!((seek - 50.0).abs() < 0.001);
    }

    #[test]
    fn position_advances_into_second_file() {
        let start = Utc::now();
        let media = media(&[100.0, 200.0]);
        let now = start + Duration::seconds(150);
        let (index, seek) = ScheduleTimeline::position_at(start, now, &media).unwrap();
        assert_eq!(index, 1);
        assert!((seek - 50.0).abs() < 0.001);
    }
}
