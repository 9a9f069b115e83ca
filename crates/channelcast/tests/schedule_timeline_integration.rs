//! Schedule timeline persistence, exercised against an in-memory SQLite
//! database so `initialize`/`get`/`set` are tested against the real
//! repository rather than just the pure `position_at` math.

use std::sync::Arc;

use channelcast::config::DatabaseConfig;
use channelcast::database::repositories::schedule_start_time::ScheduleStartTimeRepository;
use channelcast::database::Database;
use channelcast::schedule::ScheduleTimeline;
use chrono::{Duration, Utc};
use uuid::Uuid;

async fn test_db() -> Database {
    let config = DatabaseConfig { url: "sqlite::memory:".to_string(), max_connections: 1 };
    let db = Database::new(&config).await.expect("connect");
    db.migrate().await.expect("migrate");
    db
}

#[tokio::test]
async fn initialize_is_idempotent() {
    let db = test_db().await;
    let connection: Arc<_> = db.connection().clone().into();
    let timeline = ScheduleTimeline::new(Arc::new(ScheduleStartTimeRepository::new(connection)));
    let channel_id = Uuid::new_v4();

    assert!(!timeline.has(channel_id).await.expect("has"));

    let first = timeline.initialize(channel_id).await.expect("initialize");
    let second = timeline.initialize(channel_id).await.expect("initialize again");
    assert_eq!(first, second);
    assert!(timeline.has(channel_id).await.expect("has"));
}

#[tokio::test]
async fn set_overrides_the_anchor_unconditionally() {
    let db = test_db().await;
    let connection: Arc<_> = db.connection().clone().into();
    let timeline = ScheduleTimeline::new(Arc::new(ScheduleStartTimeRepository::new(connection)));
    let channel_id = Uuid::new_v4();

    timeline.initialize(channel_id).await.expect("initialize");
    let rewound = Utc::now() - Duration::hours(2);
    timeline.set(channel_id, rewound).await.expect("set");

    let stored = timeline.get(channel_id).await.expect("get").expect("present");
    assert_eq!(stored.timestamp(), rewound.timestamp());
}
