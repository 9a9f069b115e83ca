use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "channels")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub slug: String,
    pub name: String,
    pub output_dir: String,
    pub video_bitrate_kbps: i32,
    pub audio_bitrate_kbps: i32,
    pub resolution: String,
    pub fps: i32,
    pub segment_duration: i32,
    pub auto_start: bool,
    pub use_dynamic_playlist: bool,
    pub include_bumpers: bool,
    pub state: String,
    pub current_index: i32,
    pub viewer_count: i32,
    pub started_at: Option<DateTimeUtc>,
    pub last_error: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::channel_buckets::Entity")]
    ChannelBuckets,
    #[sea_orm(has_many = "super::schedule_blocks::Entity")]
    ScheduleBlocks,
    #[sea_orm(has_many = "super::bucket_progression::Entity")]
    BucketProgression,
    #[sea_orm(has_many = "super::playback_sessions::Entity")]
    PlaybackSessions,
    #[sea_orm(has_one = "super::schedule_start_times::Entity")]
    ScheduleStartTime,
}

impl Related<super::channel_buckets::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ChannelBuckets.def()
    }
}

impl Related<super::schedule_blocks::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ScheduleBlocks.def()
    }
}

impl Related<super::schedule_start_times::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ScheduleStartTime.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
