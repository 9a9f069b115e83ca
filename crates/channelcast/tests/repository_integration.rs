//! Repository layer integration tests, run against an in-memory SQLite
//! database with the real migrations applied.

use std::sync::Arc;

use channelcast::config::DatabaseConfig;
use channelcast::database::repositories::bucket::{BucketCreateRequest, BucketSeaOrmRepository};
use channelcast::database::repositories::channel::{
    ChannelCreateRequest, ChannelSeaOrmRepository, ChannelUpdateRequest,
};
use channelcast::database::repositories::media_file::{MediaFileCreateRequest, MediaFileSeaOrmRepository};
use channelcast::database::repositories::schedule_block::{
    ScheduleBlockCreateRequest, ScheduleBlockSeaOrmRepository,
};
use channelcast::database::repositories::Repository;
use channelcast::database::Database;
use channelcast::models::{BucketType, ChannelConfig, ChannelState, PlaybackMode};
use chrono::NaiveTime;
use uuid::Uuid;

async fn test_db() -> Database {
    let config = DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
    };
    let db = Database::new(&config).await.expect("connect");
    db.migrate().await.expect("migrate");
    db
}

#[tokio::test]
async fn channel_crud_round_trips_through_sqlite() {
    let db = test_db().await;
    let connection: Arc<_> = db.connection().clone().into();
    let channels = ChannelSeaOrmRepository::new(connection);

    let created = channels
        .create(ChannelCreateRequest {
            slug: "news-24".to_string(),
            name: "News 24".to_string(),
            output_dir: "/data/news-24".to_string(),
            config: ChannelConfig::default(),
        })
        .await
        .expect("create");
    assert_eq!(created.state, ChannelState::Idle);
    assert_eq!(created.metadata.current_index, 0);

    let found = channels.find_by_slug("news-24").await.expect("find_by_slug");
    assert_eq!(found.expect("present").id, created.id);

    let updated = channels
        .update(
            &created.id,
            ChannelUpdateRequest {
                name: None,
                config: None,
                state: Some(ChannelState::Starting),
                current_index: Some(3),
                viewer_count: None,
                started_at: None,
                last_error: None,
            },
        )
        .await
        .expect("update");
    assert_eq!(updated.state, ChannelState::Starting);
    assert_eq!(updated.metadata.current_index, 3);

    channels.delete(&created.id).await.expect("delete");
    assert!(channels.find_by_id(&created.id).await.expect("find_by_id").is_none());
}

#[tokio::test]
async fn bucket_membership_preserves_insertion_order() {
    let db = test_db().await;
    let connection: Arc<_> = db.connection().clone().into();
    let buckets = BucketSeaOrmRepository::new(Arc::clone(&connection));
    let media_files = MediaFileSeaOrmRepository::new(Arc::clone(&connection));

    let bucket = buckets
        .create(BucketCreateRequest { name: "sitcoms".to_string(), bucket_type: BucketType::Global })
        .await
        .expect("create bucket");

    let mut expected_order = Vec::new();
    for i in 0..3 {
        let media = media_files
            .create(MediaFileCreateRequest {
                path: format!("/media/ep{i}.mp4"),
                filename: format!("ep{i}.mp4"),
                duration_seconds: 1200.0,
                file_size: 1_000_000,
                show_name: Some("A Sitcom".to_string()),
                season: Some(1),
                episode: Some(i as u32 + 1),
                title: None,
            })
            .await
            .expect("create media");
        buckets.add_member(bucket.id, media.id).await.expect("add_member");
        expected_order.push(media.id);
    }

    let refreshed = buckets.find_by_id(&bucket.id).await.expect("find_by_id").expect("present");
    assert_eq!(refreshed.media_ids, expected_order);

    buckets.remove_member(bucket.id, expected_order[1]).await.expect("remove_member");
    let refreshed = buckets.find_by_id(&bucket.id).await.expect("find_by_id").expect("present");
    assert_eq!(refreshed.media_ids, vec![expected_order[0], expected_order[2]]);
}

#[tokio::test]
async fn channel_bucket_association_orders_by_priority_descending() {
    let db = test_db().await;
    let connection: Arc<_> = db.connection().clone().into();
    let channels = ChannelSeaOrmRepository::new(Arc::clone(&connection));
    let buckets = BucketSeaOrmRepository::new(Arc::clone(&connection));

    let channel = channels
        .create(ChannelCreateRequest {
            slug: "mixed".to_string(),
            name: "Mixed".to_string(),
            output_dir: "/data/mixed".to_string(),
            config: ChannelConfig::default(),
        })
        .await
        .expect("create channel");

    let low = buckets
        .create(BucketCreateRequest { name: "filler".to_string(), bucket_type: BucketType::ChannelSpecific })
        .await
        .expect("create low priority bucket");
    let high = buckets
        .create(BucketCreateRequest { name: "primetime".to_string(), bucket_type: BucketType::ChannelSpecific })
        .await
        .expect("create high priority bucket");

    buckets.associate_channel(channel.id, low.id, 1).await.expect("associate low");
    buckets.associate_channel(channel.id, high.id, 10).await.expect("associate high");

    let ordered = buckets.find_for_channel(channel.id).await.expect("find_for_channel");
    assert_eq!(ordered.len(), 2);
    assert_eq!(ordered[0].bucket_id, high.id);
    assert_eq!(ordered[1].bucket_id, low.id);
}

#[tokio::test]
async fn schedule_block_rejects_lookup_of_unknown_id() {
    let db = test_db().await;
    let connection: Arc<_> = db.connection().clone().into();
    let schedule_blocks = ScheduleBlockSeaOrmRepository::new(connection);

    assert!(schedule_blocks.find_by_id(&Uuid::new_v4()).await.expect("find_by_id").is_none());
}

#[tokio::test]
async fn schedule_block_round_trips_days_and_times() {
    let db = test_db().await;
    let connection: Arc<_> = db.connection().clone().into();
    let channels = ChannelSeaOrmRepository::new(Arc::clone(&connection));
    let buckets = BucketSeaOrmRepository::new(Arc::clone(&connection));
    let schedule_blocks = ScheduleBlockSeaOrmRepository::new(Arc::clone(&connection));

    let channel = channels
        .create(ChannelCreateRequest {
            slug: "dynamic".to_string(),
            name: "Dynamic".to_string(),
            output_dir: "/data/dynamic".to_string(),
            config: ChannelConfig { use_dynamic_playlist: true, ..ChannelConfig::default() },
        })
        .await
        .expect("create channel");
    let bucket = buckets
        .create(BucketCreateRequest { name: "weekday-mornings".to_string(), bucket_type: BucketType::ChannelSpecific })
        .await
        .expect("create bucket");

    let block = schedule_blocks
        .create(ScheduleBlockCreateRequest {
            channel_id: channel.id,
            day_of_week: vec![1, 2, 3, 4, 5],
            start_time: NaiveTime::from_hms_opt(6, 0, 0).unwrap(),
            end_time: NaiveTime::from_hms_opt(9, 0, 0).unwrap(),
            bucket_id: bucket.id,
            playback_mode: PlaybackMode::Shuffle,
            priority: 5,
            enabled: true,
        })
        .await
        .expect("create schedule block");

    let found = schedule_blocks.find_by_id(&block.id).await.expect("find_by_id").expect("present");
    assert_eq!(found.day_of_week, vec![1, 2, 3, 4, 5]);
    assert_eq!(found.start_time, NaiveTime::from_hms_opt(6, 0, 0).unwrap());
    assert_eq!(found.playback_mode, PlaybackMode::Shuffle);
}
