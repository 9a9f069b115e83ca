//! HTTP-level integration tests for the channel and bucket API, exercised
//! in-process against the real router with an in-memory SQLite database and
//! a fake transcoder (no ffmpeg subprocess involved).

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use channelcast::bumper::BumperGenerator;
use channelcast::config::{Config, DatabaseConfig};
use channelcast::database::repositories::bucket::BucketSeaOrmRepository;
use channelcast::database::repositories::bucket_progression::BucketProgressionRepository;
use channelcast::database::repositories::channel::ChannelSeaOrmRepository;
use channelcast::database::repositories::media_file::MediaFileSeaOrmRepository;
use channelcast::database::repositories::playback_session::PlaybackSessionRepository;
use channelcast::database::repositories::schedule_block::ScheduleBlockSeaOrmRepository;
use channelcast::database::repositories::schedule_start_time::ScheduleStartTimeRepository;
use channelcast::database::Database;
use channelcast::epg::EpgGenerator;
use channelcast::playlist::PlaylistResolver;
use channelcast::runtime::{ChannelRuntime, ViewerEdgeBridge};
use channelcast::schedule::ScheduleTimeline;
use channelcast::transcoder::{FakeTranscoderAdapter, TranscoderAdapter};
use channelcast::viewer::ViewerPresenceTracker;
use channelcast::web::{AppState, WebServer};
use serde_json::{json, Value};
use tower::ServiceExt;

async fn test_state() -> AppState {
    let config = Config::default();
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
        Arc::clone(&schedule_blocks),
        bucket_progression,
        Arc::clone(&media_files),
    ));
    let bumper_generator = Arc::new(BumperGenerator::new("ffmpeg"));
    let epg = Arc::new(EpgGenerator::new());
    let transcoder: Arc<dyn TranscoderAdapter> = Arc::new(FakeTranscoderAdapter::new());

    let runtime = ChannelRuntime::new(
        Arc::clone(&channels),
        playback_sessions,
        Arc::clone(&schedule_timeline),
        Arc::clone(&playlist_resolver),
        bumper_generator,
        transcoder,
        Arc::clone(&epg),
        None,
        config.clone(),
    );
    let viewer_tracker = ViewerPresenceTracker::new(
        Duration::from_secs(30),
        Duration::from_secs(5),
        ViewerEdgeBridge::new(&runtime),
        None,
    );

    AppState {
        runtime,
        channels,
        buckets,
        schedule_blocks,
        media_files,
        playlist_resolver,
        schedule_timeline,
        epg,
        viewer_tracker,
        database,
        config,
    }
}

#[tokio::test]
async fn create_then_get_channel_round_trips_over_http() {
    let app = WebServer::router(test_state().await);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/channels")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({ "slug": "movies", "name": "Movies", "output_dir": "/data/movies" }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let created: Value = serde_json::from_slice(&body).unwrap();
    let id = created["data"]["id"].as_str().expect("channel id").to_string();

    let response = app
        .oneshot(Request::builder().uri(format!("/api/v1/channels/{id}")).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn duplicate_slug_returns_409() {
    let app = WebServer::router(test_state().await);

    let create = || {
        Request::builder()
            .method("POST")
            .uri("/api/v1/channels")
            .header("content-type", "application/json")
            .body(Body::from(
                json!({ "slug": "news", "name": "News", "output_dir": "/data/news" }).to_string(),
            ))
            .unwrap()
    };

    let first = app.clone().oneshot(create()).await.unwrap();
    assert_eq!(first.status(), StatusCode::CREATED);

    let second = app.oneshot(create()).await.unwrap();
    assert_eq!(second.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn unknown_channel_returns_404() {
    let app = WebServer::router(test_state().await);
    let missing = uuid::Uuid::new_v4();

    let response = app
        .oneshot(Request::builder().uri(format!("/api/v1/channels/{missing}")).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn health_check_reports_database_status() {
    let app = WebServer::router(test_state().await);

    let response = app.oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap()).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn invalid_slug_segment_is_rejected() {
    let app = WebServer::router(test_state().await);

    let response = app
        .oneshot(Request::builder().uri("/Not Valid/stream.m3u8").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_ne!(response.status(), StatusCode::OK);
}
