//! Channel Runtime: the orchestrator that composes the Schedule Timeline,
//! Playlist Resolver, Bumper Generator, Concat File Manager, Transcoder
//! Adapter, EPG Generator and Viewer Presence Tracker into start/stop/restart
//! and the background progression loop.

pub mod recovery;

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex as AsyncMutex;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::bumper::{BumperGenerator, BumperSpec};
use crate::concat::{ConcatFileManager, BUMPER_FILE_NAME};
use crate::config::Config;
use crate::database::repositories::channel::{ChannelSeaOrmRepository, ChannelUpdateRequest};
use crate::database::repositories::playback_session::PlaybackSessionRepository;
use crate::database::repositories::Repository;
use crate::epg::EpgGenerator;
use crate::errors::{AppResult, RuntimeError};
use crate::models::{Channel, ChannelState, MediaFile, SessionKind, SessionTrigger};
use crate::observability::RuntimeObservability;
use crate::playlist::{PlaylistResolver, ResolveContext};
use crate::schedule::ScheduleTimeline;
use crate::transcoder::{TranscodeConfig, TranscoderAdapter};
use crate::viewer::{ViewerEdgeSink, ViewerPresenceTracker};

struct ChannelRuntimeState {
    progression_cancel: Option<CancellationToken>,
    active_schedule_block: Option<Uuid>,
}

impl ChannelRuntimeState {
    fn new() -> Self {
        Self {
            progression_cancel: None,
            active_schedule_block: None,
        }
    }
}

pub struct ChannelRuntime {
    channels: Arc<ChannelSeaOrmRepository>,
    playback_sessions: Arc<PlaybackSessionRepository>,
    schedule_timeline: Arc<ScheduleTimeline>,
    playlist_resolver: Arc<PlaylistResolver>,
    bumper_generator: Arc<BumperGenerator>,
    transcoder: Arc<dyn TranscoderAdapter>,
    epg: Arc<EpgGenerator>,
    observability: Option<Arc<RuntimeObservability>>,
    config: Config,
    /// One mutex per channel: the single linearization point for all
    /// transition-state mutations on that channel (§4.9, "Per-channel mutex").
    channel_locks: AsyncMutex<HashMap<Uuid, Arc<AsyncMutex<ChannelRuntimeState>>>>,
    streaming_count: AtomicUsize,
}

impl ChannelRuntime {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        channels: Arc<ChannelSeaOrmRepository>,
        playback_sessions: Arc<PlaybackSessionRepository>,
        schedule_timeline: Arc<ScheduleTimeline>,
        playlist_resolver: Arc<PlaylistResolver>,
        bumper_generator: Arc<BumperGenerator>,
        transcoder: Arc<dyn TranscoderAdapter>,
        epg: Arc<EpgGenerator>,
        observability: Option<Arc<RuntimeObservability>>,
        config: Config,
    ) -> Arc<Self> {
        Arc::new(Self {
            channels,
            playback_sessions,
            schedule_timeline,
            playlist_resolver,
            bumper_generator,
            transcoder,
            epg,
            observability,
            config,
            channel_locks: AsyncMutex::new(HashMap::new()),
            streaming_count: AtomicUsize::new(0),
        })
    }

    async fn lock_for(&self, channel_id: Uuid) -> Arc<AsyncMutex<ChannelRuntimeState>> {
        let mut locks = self.channel_locks.lock().await;
        locks
            .entry(channel_id)
            .or_insert_with(|| Arc::new(AsyncMutex::new(ChannelRuntimeState::new())))
            .clone()
    }

    fn output_dir(&self, channel: &Channel) -> PathBuf {
        PathBuf::from(&channel.output_dir)
    }

    async fn media_for(&self, channel: &Channel) -> AppResult<Vec<MediaFile>> {
        self.media_for_at(channel, chrono::Utc::now()).await
    }

    async fn media_for_at(
        &self,
        channel: &Channel,
        at: chrono::DateTime<chrono::Utc>,
    ) -> AppResult<Vec<MediaFile>> {
        self.playlist_resolver
            .resolve_media(
                channel,
                &ResolveContext {
                    current_time: at,
                    current_index: Some(channel.metadata.current_index),
                },
            )
            .await
    }

    /// §4.9 step 2. Resolves a temporary media list at `now`; for dynamic
    /// channels, generates the EPG against that temporary list, finds the
    /// currently-airing program, and re-resolves pinned to that program's
    /// `startTime` so a schedule block that is still airing wins over
    /// whichever block happens to be active at this exact instant. Falls
    /// back to the temporary (resolve-at-now) list if the pinned resolve
    /// comes back empty.
    async fn resolve_start_media(&self, channel: &Channel) -> AppResult<Vec<MediaFile>> {
        let now = chrono::Utc::now();
        let temp_media = self.media_for_at(channel, now).await?;
        if !channel.config.use_dynamic_playlist || temp_media.is_empty() {
            return Ok(temp_media);
        }

        let schedule_start = self.schedule_timeline.get(channel.id).await?.unwrap_or(now);
        let programs = self
            .epg
            .generate_programs(channel, schedule_start, &self.playlist_resolver, self.observability.as_deref())
            .await?;
        let Some(current) = programs.iter().find(|p| p.start_time <= now && now < p.end_time) else {
            return Ok(temp_media);
        };

        let pinned_media = self.media_for_at(channel, current.start_time).await?;
        if pinned_media.is_empty() {
            Ok(temp_media)
        } else {
            Ok(pinned_media)
        }
    }

    /// §4.9 `start`. `is_transition` skips the segment-directory wipe and the
    /// illegal-state coercion used for a schedule-block handoff.
    pub async fn start(
        self: &Arc<Self>,
        channel_id: Uuid,
        start_index: Option<usize>,
        is_transition: bool,
    ) -> AppResult<()> {
        if !is_transition {
            if let Some(cap) = self.config.streaming.max_concurrent_streams {
                if self.streaming_count.load(Ordering::SeqCst) >= cap {
                    return Err(RuntimeError::conflict("maxConcurrentStreams reached"));
                }
            }
        }

        let lock = self.lock_for(channel_id).await;
        let mut state = lock.lock().await;

        let mut channel = self
            .channels
            .find_by_id(&channel_id)
            .await?
            .ok_or_else(|| RuntimeError::not_found("channel", channel_id.to_string()))?;

        match channel.state {
            ChannelState::Stopping | ChannelState::Error => {
                channel.transition_to(ChannelState::Idle)?;
            }
            ChannelState::Starting if !is_transition => {
                channel.transition_to(ChannelState::Idle)?;
            }
            ChannelState::Streaming if !is_transition => {
                return Err(RuntimeError::conflict("channel already streaming"));
            }
            ChannelState::Streaming if is_transition => {
                // Schedule-block handoff: the channel stays logically "on air"
                // but the state machine has no STREAMING->STARTING edge, so
                // step through STOPPING->IDLE first.
                channel.transition_to(ChannelState::Stopping)?;
                channel.transition_to(ChannelState::Idle)?;
            }
            _ => {}
        }

        let result = self.start_inner(&mut channel, &mut state, start_index, is_transition).await;
        if let Err(e) = &result {
            channel.set_error(e.to_string());
            let _ = self.persist_channel_state(&channel).await;
            let _ = self.transcoder.stop(channel_id).await;
        }
        result
    }

    async fn start_inner(
        self: &Arc<Self>,
        channel: &mut Channel,
        state: &mut ChannelRuntimeState,
        start_index: Option<usize>,
        is_transition: bool,
    ) -> AppResult<()> {
        channel.transition_to(ChannelState::Starting)?;
        self.persist_channel_state(channel).await?;

        let media = self.resolve_start_media(channel).await?;
        if media.is_empty() {
            return Err(RuntimeError::no_media(channel.id.to_string()));
        }

        let (index, seek) = if let Some(index) = start_index {
            (index, 0.0)
        } else if self.schedule_timeline.has(channel.id).await? {
            match self.epg.get_current_playback_position(channel.id, &media, chrono::Utc::now()) {
                Some(pos) => pos,
                None => self
                    .schedule_timeline
                    .current_position(channel.id, &media)
                    .await?
                    .unwrap_or((channel.metadata.current_index, 0.0)),
            }
        } else {
            (channel.metadata.current_index, 0.0)
        };

        self.schedule_timeline.initialize(channel.id).await?;

        let index = index.min(media.len() - 1);
        let seek = seek.max(0.0);

        let output_dir = self.output_dir(channel);
        tokio::fs::create_dir_all(&output_dir)
            .await
            .map_err(|e| RuntimeError::io_failure(format!("failed to create output dir: {e}")))?;

        if !is_transition {
            clear_segments(&output_dir).await;
        }

        let bumper_path = output_dir.join(BUMPER_FILE_NAME);
        if channel.config.include_bumpers {
            if let Some(next) = media.get((index + 1) % media.len()) {
                self.regenerate_bumper(channel, next, &bumper_path).await;
            }
        }

        state.active_schedule_block = self
            .playlist_resolver
            .active_block_id(channel, chrono::Utc::now())
            .await?;

        let media_paths: Vec<String> = media.iter().map(|m| m.path.clone()).collect();
        let bumper_arg = channel.config.include_bumpers.then_some(bumper_path.as_path());
        let concat = ConcatFileManager::create_concat_file(
            &output_dir,
            &media_paths,
            bumper_arg,
            index,
            seek,
            state.active_schedule_block,
        )
        .await?;

        if self.transcoder.is_active(channel.id).await {
            self.transcoder.stop(channel.id).await?;
            tokio::time::sleep(Duration::from_millis(self.config.streaming.stop_start_settle_ms)).await;
        }

        self.transcoder
            .start(
                channel.id,
                TranscodeConfig {
                    concat_file: concat.concat_file_path,
                    output_dir: output_dir.clone(),
                    video_bitrate_kbps: channel.config.video_bitrate_kbps,
                    audio_bitrate_kbps: channel.config.audio_bitrate_kbps,
                    resolution: channel.config.resolution.clone(),
                    fps: channel.config.fps,
                    segment_duration: channel.config.segment_duration,
                    start_position_seconds: concat.start_position,
                    hwaccel: self.config.streaming.hwaccel,
                },
            )
            .await?;

        channel.update_current_index(index);
        channel.transition_to(ChannelState::Streaming)?;
        self.persist_channel_state(channel).await?;
        self.streaming_count.fetch_add(1, Ordering::SeqCst);

        self.playback_sessions
            .open(
                channel.id,
                if is_transition { SessionKind::Resumed } else { SessionKind::Started },
                SessionTrigger::Automatic,
            )
            .await?;

        if let Some(obs) = &self.observability {
            obs.channel_state_transitions.add(1, &[]);
            obs.streaming_channels.add(1, &[]);
        }

        self.spawn_progression_loop(channel.id, state);
        info!(channel_id = %channel.id, index, seek, "channel streaming");
        Ok(())
    }

    async fn regenerate_bumper(&self, channel: &Channel, next: &MediaFile, bumper_path: &std::path::Path) {
        let spec = BumperSpec {
            show_name: next.show_name.clone().unwrap_or_else(|| channel.name.clone()),
            episode_title: next.display_title().to_string(),
            duration_seconds: 5.0,
            resolution: channel.config.resolution.clone(),
            fps: channel.config.fps,
            video_bitrate_kbps: channel.config.video_bitrate_kbps,
            audio_bitrate_kbps: channel.config.audio_bitrate_kbps,
        };
        if let Err(e) = self.bumper_generator.generate(&spec, bumper_path, self.observability.as_deref()).await {
            warn!(channel_id = %channel.id, error = %e, "bumper render failed, trying placeholder");
            if let Err(e) = self.bumper_generator.generate_placeholder(bumper_path).await {
                warn!(channel_id = %channel.id, error = %e, "placeholder bumper also failed, proceeding without one");
            }
        }
    }

    /// §4.9 `stop`.
    pub async fn stop(self: &Arc<Self>, channel_id: Uuid) -> AppResult<()> {
        let lock = self.lock_for(channel_id).await;
        let mut state = lock.lock().await;

        let mut channel = self
            .channels
            .find_by_id(&channel_id)
            .await?
            .ok_or_else(|| RuntimeError::not_found("channel", channel_id.to_string()))?;

        if channel.state != ChannelState::Streaming {
            info!(channel_id = %channel_id, state = %channel.state, "stop requested on non-streaming channel, ignoring");
            return Ok(());
        }

        channel.transition_to(ChannelState::Stopping)?;
        self.persist_channel_state(&channel).await?;

        if let Some(token) = state.progression_cancel.take() {
            token.cancel();
        }
        if let Err(e) = self.transcoder.stop(channel_id).await {
            warn!(channel_id = %channel_id, error = %e, "transcoder stop reported an error, continuing");
        }
        let _ = self.playback_sessions.close_open(channel_id).await;

        channel.transition_to(ChannelState::Idle)?;
        self.persist_channel_state(&channel).await?;
        state.active_schedule_block = None;
        self.streaming_count.fetch_sub(1, Ordering::SeqCst);

        if let Some(obs) = &self.observability {
            obs.channel_state_transitions.add(1, &[]);
            obs.streaming_channels.add(-1, &[]);
        }
        info!(channel_id = %channel_id, "channel stopped");
        Ok(())
    }

    /// §4.9 `restart`: stop then start at the current index, idempotent under
    /// concurrent callers because both halves run under the channel mutex.
    pub async fn restart(self: &Arc<Self>, channel_id: Uuid) -> AppResult<()> {
        self.stop(channel_id).await?;
        self.start(channel_id, None, false).await
    }

    /// Collaborators call this after mutating buckets/schedule-blocks/library
    /// associations. If the channel is streaming, rewrites the manifest in
    /// place and invalidates the EPG cache.
    pub async fn invalidate_channel_media_cache(self: &Arc<Self>, channel_id: Uuid) -> AppResult<()> {
        self.epg.invalidate(channel_id);

        let lock = self.lock_for(channel_id).await;
        let state = lock.lock().await;

        let channel = self
            .channels
            .find_by_id(&channel_id)
            .await?
            .ok_or_else(|| RuntimeError::not_found("channel", channel_id.to_string()))?;

        if channel.state != ChannelState::Streaming {
            return Ok(());
        }

        let media = self.media_for(&channel).await?;
        if media.is_empty() {
            return Err(RuntimeError::no_media(channel.id.to_string()));
        }
        let media_paths: Vec<String> = media.iter().map(|m| m.path.clone()).collect();
        let output_dir = self.output_dir(&channel);
        let bumper_path = output_dir.join(BUMPER_FILE_NAME);
        let bumper_arg = channel.config.include_bumpers.then_some(bumper_path.as_path());

        ConcatFileManager::update_concat_file(&output_dir, &media_paths, bumper_arg, state.active_schedule_block)
            .await?;
        if let Some(obs) = &self.observability {
            obs.concat_file_writes.add(1, &[]);
        }
        Ok(())
    }

    fn spawn_progression_loop(self: &Arc<Self>, channel_id: Uuid, state: &mut ChannelRuntimeState) {
        let token = CancellationToken::new();
        state.progression_cancel = Some(token.clone());
        let runtime = self.clone();
        let tick = Duration::from_secs(self.config.streaming.progression_tick_seconds);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(tick);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if let Err(e) = runtime.progression_tick(channel_id).await {
                            error!(channel_id = %channel_id, error = %e, "progression tick failed");
                        }
                    }
                    _ = token.cancelled() => break,
                }
            }
        });
    }

    /// §4.9.1. For dynamic-playlist channels, detects a schedule-block change
    /// and triggers §4.9.2's transition; otherwise just refreshes the
    /// persisted `currentIndex`/`scheduleStartTime`-derived position so a
    /// later restart resumes close to "now" (the transcoder itself advances
    /// files independently of this loop).
    async fn progression_tick(self: &Arc<Self>, channel_id: Uuid) -> AppResult<()> {
        let start = std::time::Instant::now();
        let lock = self.lock_for(channel_id).await;
        let mut state = lock.lock().await;

        let mut channel = self
            .channels
            .find_by_id(&channel_id)
            .await?
            .ok_or_else(|| RuntimeError::not_found("channel", channel_id.to_string()))?;

        if channel.state != ChannelState::Streaming {
            return Ok(());
        }

        if channel.config.use_dynamic_playlist {
            let active_block = self.playlist_resolver.active_block_id(&channel, chrono::Utc::now()).await?;
            if active_block != state.active_schedule_block {
                drop(state);
                return self.handle_schedule_block_transition(channel_id).await;
            }
        }

        let media = self.media_for(&channel).await?;
        if let Some((index, _seek)) = self.schedule_timeline.current_position(channel_id, &media).await? {
            if index != channel.metadata.current_index {
                channel.update_current_index(index);
                self.persist_channel_state(&channel).await?;
            }
        }

        if let Some(obs) = &self.observability {
            obs.progression_tick_duration_ms
                .record(start.elapsed().as_secs_f64() * 1000.0, &[]);
        }
        Ok(())
    }

    /// §4.9.2.
    async fn handle_schedule_block_transition(self: &Arc<Self>, channel_id: Uuid) -> AppResult<()> {
        if let Some(obs) = &self.observability {
            obs.schedule_block_transitions.add(1, &[]);
        }
        self.invalidate_channel_media_cache(channel_id).await?;
        self.start(channel_id, None, true).await
    }

    async fn persist_channel_state(&self, channel: &Channel) -> AppResult<()> {
        self.channels
            .update(
                &channel.id,
                ChannelUpdateRequest {
                    name: None,
                    config: None,
                    state: Some(channel.state),
                    current_index: Some(channel.metadata.current_index),
                    viewer_count: Some(channel.metadata.viewer_count),
                    started_at: Some(channel.metadata.started_at),
                    last_error: Some(channel.metadata.last_error.clone()),
                },
            )
            .await?;
        Ok(())
    }

    /// Background snapshot task: periodically folds the live viewer count
    /// back into every streaming channel's persisted row, so a crash between
    /// progression ticks loses at most one interval of viewer-count history.
    /// Mirrors the teacher's `JobScheduler::run` shape (ticking interval
    /// raced against a cancellation token) rather than the ~5s progression
    /// loop, since this is a much coarser, best-effort snapshot.
    pub async fn run_auto_save(
        self: &Arc<Self>,
        viewer_tracker: Arc<ViewerPresenceTracker>,
        interval: Duration,
        cancel: CancellationToken,
    ) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.auto_save_tick(&viewer_tracker).await {
                        error!(error = %e, "auto-save tick failed");
                    }
                }
                _ = cancel.cancelled() => break,
            }
        }
    }

    async fn auto_save_tick(&self, viewer_tracker: &ViewerPresenceTracker) -> AppResult<()> {
        let channels = self.channels.find_all().await?;
        for channel in channels.into_iter().filter(|c| c.state == ChannelState::Streaming) {
            let viewer_count = viewer_tracker.viewer_count(channel.id).await;
            self.channels
                .update(
                    &channel.id,
                    ChannelUpdateRequest {
                        name: None,
                        config: None,
                        state: None,
                        current_index: Some(channel.metadata.current_index),
                        viewer_count: Some(viewer_count),
                        started_at: None,
                        last_error: None,
                    },
                )
                .await?;
        }
        Ok(())
    }
}

async fn clear_segments(output_dir: &std::path::Path) {
    let Ok(mut entries) = tokio::fs::read_dir(output_dir).await else {
        return;
    };
    while let Ok(Some(entry)) = entries.next_entry().await {
        if entry.file_name().to_str().map(|n| n.starts_with("stream_") && n.ends_with(".ts")).unwrap_or(false) {
            let _ = tokio::fs::remove_file(entry.path()).await;
        }
    }
}

/// Bridges `ViewerPresenceTracker`'s edge callbacks (which take `&self`) back
/// into `ChannelRuntime::start`/`stop` (which need `Arc<Self>` to spawn the
/// progression loop). Built from a `Weak` so the tracker doesn't keep the
/// runtime alive past its own lifetime.
pub struct ViewerEdgeBridge {
    runtime: std::sync::Weak<ChannelRuntime>,
}

impl ViewerEdgeBridge {
    pub fn new(runtime: &Arc<ChannelRuntime>) -> Arc<Self> {
        Arc::new(Self {
            runtime: Arc::downgrade(runtime),
        })
    }
}

#[async_trait]
impl ViewerEdgeSink for ViewerEdgeBridge {
    async fn on_first_viewer(&self, channel_id: Uuid) {
        let Some(runtime) = self.runtime.upgrade() else {
            return;
        };
        if let Err(e) = runtime.start(channel_id, None, false).await {
            warn!(channel_id = %channel_id, error = %e, "failed to start channel on first viewer");
        }
    }

    async fn on_last_viewer_gone(&self, channel_id: Uuid) {
        let Some(runtime) = self.runtime.upgrade() else {
            return;
        };
        if let Err(e) = runtime.stop(channel_id).await {
            warn!(channel_id = %channel_id, error = %e, "failed to stop channel on last viewer gone");
        }
    }
}
