//! End-to-end orchestration tests against `ChannelRuntime` itself (not the
//! HTTP layer), using the fake transcoder so no ffmpeg process is involved.
//! Covers the core start/stop/admission-control properties described for
//! the orchestrator.

use std::sync::Arc;

use channelcast::bumper::BumperGenerator;
use channelcast::config::{Config, DatabaseConfig};
use channelcast::database::repositories::bucket::{BucketCreateRequest, BucketSeaOrmRepository};
use channelcast::database::repositories::bucket_progression::BucketProgressionRepository;
use channelcast::database::repositories::channel::{ChannelCreateRequest, ChannelSeaOrmRepository};
use channelcast::database::repositories::media_file::{MediaFileCreateRequest, MediaFileSeaOrmRepository};
use channelcast::database::repositories::playback_session::PlaybackSessionRepository;
use channelcast::database::repositories::schedule_block::ScheduleBlockSeaOrmRepository;
use channelcast::database::repositories::schedule_start_time::ScheduleStartTimeRepository;
use channelcast::database::repositories::Repository;
use channelcast::database::Database;
use channelcast::epg::EpgGenerator;
use channelcast::errors::RuntimeError;
use channelcast::models::{BucketType, ChannelConfig, ChannelState};
use channelcast::playlist::PlaylistResolver;
use channelcast::runtime::ChannelRuntime;
use channelcast::schedule::ScheduleTimeline;
use channelcast::transcoder::{FakeTranscoderAdapter, TranscoderAdapter};
use uuid::Uuid;

struct Fixture {
    runtime: Arc<ChannelRuntime>,
    channels: Arc<ChannelSeaOrmRepository>,
    buckets: Arc<BucketSeaOrmRepository>,
    media_files: Arc<MediaFileSeaOrmRepository>,
}

async fn build(max_concurrent_streams: Option<usize>) -> Fixture {
    let db_config = DatabaseConfig { url: "sqlite::memory:".to_string(), max_connections: 1 };
    let database = Database::new(&db_config).await.expect("connect");
    database.migrate().await.expect("migrate");

    let connection: Arc<_> = database.connection().clone().into();
    let channels = Arc::new(ChannelSeaOrmRepository::new(Arc::clone(&connection)));
    let buckets = Arc::new(BucketSeaOrmRepository::new(Arc::clone(&connection)));
    let schedule_blocks = Arc::new(ScheduleBlockSeaOrmRepository::new(Arc::clone(&connection)));
    let media_files = Arc::new(MediaFileSeaOrmRepository::new(Arc::clone(&connection)));
    let bucket_progression = Arc::new(BucketProgressionRepository::new(Arc::clone(&connection)));
    let playback_sessions = Arc::new(PlaybackSessionRepository::new(Arc::clone(&connection)));
    let schedule_start_times = Arc::new(ScheduleStartTimeRepository::new(connection));

    let schedule_timeline = Arc::new(ScheduleTimeline::new(schedule_start_times));
    let playlist_resolver = Arc::new(PlaylistResolver::new(
        Arc::clone(&buckets),
        schedule_blocks,
        bucket_progression,
        Arc::clone(&media_files),
    ));
    let bumper_generator = Arc::new(BumperGenerator::new("ffmpeg"));
    let epg = Arc::new(EpgGenerator::new());
    let transcoder: Arc<dyn TranscoderAdapter> = Arc::new(FakeTranscoderAdapter::new());

    let mut config = Config::default();
    config.streaming.max_concurrent_streams = max_concurrent_streams;

    let runtime = ChannelRuntime::new(
        Arc::clone(&channels),
        playback_sessions,
        schedule_timeline,
        playlist_resolver,
        bumper_generator,
        transcoder,
        epg,
        None,
        config,
    );

    Fixture { runtime, channels, buckets, media_files }
}

/// Creates a channel with one bucket holding one ten-minute media file, so
/// `start()` has something non-empty to resolve.
async fn channel_with_media(fixture: &Fixture, slug: &str) -> Uuid {
    let channel = fixture
        .channels
        .create(ChannelCreateRequest {
            slug: slug.to_string(),
            name: slug.to_string(),
            output_dir: format!("/tmp/channelcast-test-{slug}"),
            config: ChannelConfig::default(),
        })
        .await
        .expect("create channel");

    let bucket = fixture
        .buckets
        .create(BucketCreateRequest { name: format!("{slug}-bucket"), bucket_type: BucketType::Global })
        .await
        .expect("create bucket");
    let media = fixture
        .media_files
        .create(MediaFileCreateRequest {
            path: format!("/media/{slug}.mp4"),
            filename: format!("{slug}.mp4"),
            duration_seconds: 600.0,
            file_size: 1_000_000,
            show_name: None,
            season: None,
            episode: None,
            title: None,
        })
        .await
        .expect("create media");
    fixture.buckets.add_member(bucket.id, media.id).await.expect("add_member");
    fixture.buckets.associate_channel(channel.id, bucket.id, 1).await.expect("associate_channel");

    channel.id
}

#[tokio::test]
async fn start_then_stop_round_trips_channel_state() {
    let fixture = build(None).await;
    let channel_id = channel_with_media(&fixture, "news").await;

    fixture.runtime.start(channel_id, None, false).await.expect("start");
    let streaming = fixture.channels.find_by_id(&channel_id).await.expect("find_by_id").expect("present");
    assert_eq!(streaming.state, ChannelState::Streaming);
    assert!(streaming.metadata.started_at.is_some());

    fixture.runtime.stop(channel_id).await.expect("stop");
    let stopped = fixture.channels.find_by_id(&channel_id).await.expect("find_by_id").expect("present");
    assert_eq!(stopped.state, ChannelState::Idle);
}

#[tokio::test]
async fn starting_an_already_streaming_channel_is_a_conflict() {
    let fixture = build(None).await;
    let channel_id = channel_with_media(&fixture, "sitcoms").await;

    fixture.runtime.start(channel_id, None, false).await.expect("first start");
    let err = fixture
        .runtime
        .start(channel_id, None, false)
        .await
        .expect_err("second start should conflict");
    assert!(matches!(err, RuntimeError::Conflict { .. }));
}

#[tokio::test]
async fn start_without_media_fails_with_no_media() {
    let fixture = build(None).await;
    let channel = fixture
        .channels
        .create(ChannelCreateRequest {
            slug: "empty".to_string(),
            name: "Empty".to_string(),
            output_dir: "/tmp/channelcast-test-empty".to_string(),
            config: ChannelConfig::default(),
        })
        .await
        .expect("create channel");

    let err = fixture.runtime.start(channel.id, None, false).await.expect_err("no media");
    assert!(matches!(err, RuntimeError::NoMedia { .. }));
}

#[tokio::test]
async fn admission_control_rejects_past_the_concurrent_stream_cap() {
    let fixture = build(Some(1)).await;
    let first = channel_with_media(&fixture, "one").await;
    let second = channel_with_media(&fixture, "two").await;

    fixture.runtime.start(first, None, false).await.expect("first start under cap");
    let err = fixture.runtime.start(second, None, false).await.expect_err("second start over cap");
    assert!(matches!(err, RuntimeError::Conflict { .. }));

    let untouched = fixture.channels.find_by_id(&second).await.expect("find_by_id").expect("present");
    assert_eq!(untouched.state, ChannelState::Idle);
}
