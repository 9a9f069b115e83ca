//! Playlist Resolver: picks an ordered media list for a channel at a point in
//! time, honoring schedule blocks (dynamic channels) or bucket priority
//! (static channels).

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand::rngs::StdRng;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::database::repositories::bucket::BucketSeaOrmRepository;
use crate::database::repositories::bucket_progression::BucketProgressionRepository;
use crate::database::repositories::media_file::MediaFileSeaOrmRepository;
use crate::database::repositories::schedule_block::ScheduleBlockSeaOrmRepository;
use crate::errors::AppResult;
use crate::models::{Channel, MediaFile, PlaybackMode, ScheduleBlock};

pub struct ResolveContext {
    pub current_time: DateTime<Utc>,
    pub current_index: Option<usize>,
}

pub struct PlaylistResolver {
    buckets: Arc<BucketSeaOrmRepository>,
    schedule_blocks: Arc<ScheduleBlockSeaOrmRepository>,
    progression: Arc<BucketProgressionRepository>,
    media_files: Arc<MediaFileSeaOrmRepository>,
}

impl PlaylistResolver {
    pub fn new(
        buckets: Arc<BucketSeaOrmRepository>,
        schedule_blocks: Arc<ScheduleBlockSeaOrmRepository>,
        progression: Arc<BucketProgressionRepository>,
        media_files: Arc<MediaFileSeaOrmRepository>,
    ) -> Self {
        Self {
            buckets,
            schedule_blocks,
            progression,
            media_files,
        }
    }

    pub async fn resolve_media(
        &self,
        channel: &Channel,
        ctx: &ResolveContext,
    ) -> AppResult<Vec<MediaFile>> {
        if channel.config.use_dynamic_playlist {
            if let Some(block) = self.active_block(channel.id, ctx.current_time).await? {
                return self.resolve_block(channel.id, &block, ctx.current_time).await;
            }
        }
        self.resolve_static(channel.id).await
    }

    /// Id of the schedule block that `resolve_media` would currently honor for
    /// this channel, if any. Used by the runtime to stamp concat metadata.
    pub async fn active_block_id(&self, channel: &Channel, now: DateTime<Utc>) -> AppResult<Option<Uuid>> {
        if !channel.config.use_dynamic_playlist {
            return Ok(None);
        }
        Ok(self.active_block(channel.id, now).await?.map(|b| b.id))
    }

    /// Earliest instant strictly after `now` at which some schedule block's
    /// start or end boundary falls, across the next two days (enough slack to
    /// cover the EPG's 24h horizon even when `now` lands late in a day).
    /// `None` for a channel with no schedule blocks. Lets the EPG generator
    /// know exactly when it must re-consult the resolver while walking
    /// forward, instead of only at the end of whatever list it already has.
    pub async fn next_block_boundary(
        &self,
        channel_id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<Option<DateTime<Utc>>> {
        let blocks = self.schedule_blocks.find_for_channel(channel_id).await?;
        let mut next: Option<DateTime<Utc>> = None;
        for block in blocks.iter().filter(|b| b.enabled) {
            for days_ahead in 0..2i64 {
                let date = (now + Duration::days(days_ahead)).date_naive();
                let weekday = date.format("%w").to_string().parse::<u8>().unwrap_or(0);
                if !block.day_of_week.is_empty() && !block.day_of_week.contains(&weekday) {
                    continue;
                }
                for time in [block.start_time, block.end_time] {
                    let candidate = date.and_time(time).and_utc();
                    if candidate > now && next.map_or(true, |n| candidate < n) {
                        next = Some(candidate);
                    }
                }
            }
        }
        Ok(next)
    }

    /// Among schedule blocks active at `now`, the highest priority wins; ties
    /// broken by creation order (earliest first).
    async fn active_block(
        &self,
        channel_id: Uuid,
        now: DateTime<Utc>,
    ) -> AppResult<Option<ScheduleBlock>> {
        let blocks = self.schedule_blocks.find_for_channel(channel_id).await?;
        let best = blocks
            .into_iter()
            .filter(|b| b.is_active_at(now))
            .max_by(|a, b| {
                a.priority
                    .cmp(&b.priority)
                    .then(b.created_at.cmp(&a.created_at))
            });
        Ok(best)
    }

    /// Union of ordered bucket contents, higher-priority buckets first,
    /// deduplicated preserving first occurrence.
    async fn resolve_static(&self, channel_id: Uuid) -> AppResult<Vec<MediaFile>> {
        let channel_buckets = self.buckets.find_for_channel(channel_id).await?;
        let mut seen = HashSet::new();
        let mut ordered_ids = Vec::new();

        for cb in channel_buckets {
            if let Some(bucket) = self.buckets.find_by_id(&cb.bucket_id).await.ok().flatten() {
                for id in bucket.media_ids {
                    if seen.insert(id) {
                        ordered_ids.push(id);
                    }
                }
            }
        }

        Ok(order_like(self.media_files.find_by_ids(&ordered_ids).await?, &ordered_ids))
    }

    async fn resolve_block(
        &self,
        channel_id: Uuid,
        block: &ScheduleBlock,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<MediaFile>> {
        let bucket = self.buckets.find_by_id(&block.bucket_id).await?;
        let Some(bucket) = bucket else {
            return Ok(Vec::new());
        };
        let members = order_like(
            self.media_files.find_by_ids(&bucket.media_ids).await?,
            &bucket.media_ids,
        );
        if members.is_empty() {
            return Ok(members);
        }

        match block.playback_mode {
            PlaybackMode::Sequential => self.resolve_sequential(channel_id, block.bucket_id, members).await,
            PlaybackMode::Random => Ok(seeded_shuffle(members, &seed_for_day(channel_id, block.id, now))),
            PlaybackMode::Shuffle => {
                Ok(seeded_shuffle(members, &seed_for_activation_window(channel_id, block, now)))
            }
        }
    }

    /// Rotates the member list so playback resumes where the bucket last stopped.
    async fn resolve_sequential(
        &self,
        channel_id: Uuid,
        bucket_id: Uuid,
        members: Vec<MediaFile>,
    ) -> AppResult<Vec<MediaFile>> {
        let progression = self.progression.find(channel_id, bucket_id).await?;
        let offset = progression
            .map(|p| (p.position_in_bucket + 1) % members.len().max(1))
            .unwrap_or(0);
        let mut rotated = members;
        rotated.rotate_left(offset);
        Ok(rotated)
    }
}

/// `find_by_ids` uses a SQL `IN` filter and does not preserve row order;
/// reassemble the result in the caller's requested order.
fn order_like(files: Vec<MediaFile>, ids: &[Uuid]) -> Vec<MediaFile> {
    let mut by_id: std::collections::HashMap<Uuid, MediaFile> =
        files.into_iter().map(|f| (f.id, f)).collect();
    ids.iter().filter_map(|id| by_id.remove(id)).collect()
}

/// Stable per-day seed: a given day always resolves to the same shuffle.
fn seed_for_day(channel_id: Uuid, block_id: Uuid, now: DateTime<Utc>) -> String {
    format!("{channel_id}:{block_id}:{}", now.format("%Y-%m-%d"))
}

/// Stable per-activation-window seed: re-seeded each time the block becomes active,
/// approximated here by the block's active window start (today's `start_time`).
fn seed_for_activation_window(channel_id: Uuid, block: &ScheduleBlock, now: DateTime<Utc>) -> String {
    format!(
        "{channel_id}:{}:{}:{}",
        block.id,
        now.format("%Y-%m-%d"),
        block.start_time
    )
}

fn seeded_shuffle(mut items: Vec<MediaFile>, seed_input: &str) -> Vec<MediaFile> {
    let mut hasher = Sha256::new();
    hasher.update(seed_input.as_bytes());
    let digest = hasher.finalize();
    let seed_bytes: [u8; 8] = digest[0..8].try_into().unwrap();
    let seed = u64::from_le_bytes(seed_bytes);

    let mut rng = StdRng::seed_from_u64(seed);
    items.shuffle(&mut rng);
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(id: Uuid) -> MediaFile {
        MediaFile {
            id,
            path: "x".to_string(),
            filename: "x".to_string(),
            duration_seconds: 10.0,
            file_size: 0,
            show_name: None,
            season: None,
            episode: None,
            title: None,
        }
    }

    #[test]
    fn same_day_seed_is_stable() {
        let channel_id = Uuid::new_v4();
        let block_id = Uuid::new_v4();
        let now = Utc::now();
        let members: Vec<_> = (0..5).map(|_| file(Uuid::new_v4())).collect();

        let seed = seed_for_day(channel_id, block_id, now);
        let a = seeded_shuffle(members.clone(), &seed);
        let b = seeded_shuffle(members, &seed);
        assert_eq!(a.iter().map(|m| m.id).collect::<Vec<_>>(), b.iter().map(|m| m.id).collect::<Vec<_>>());
    }
}
