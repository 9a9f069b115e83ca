//! SeaORM repository implementations, one module per entity.

pub mod bucket;
pub mod bucket_progression;
pub mod channel;
pub mod media_file;
pub mod playback_session;
pub mod schedule_block;
pub mod schedule_start_time;
pub mod setting;
pub mod traits;

pub use bucket::BucketSeaOrmRepository;
pub use bucket_progression::BucketProgressionRepository;
pub use channel::ChannelSeaOrmRepository;
pub use media_file::MediaFileSeaOrmRepository;
pub use playback_session::PlaybackSessionRepository;
pub use schedule_block::ScheduleBlockSeaOrmRepository;
pub use schedule_start_time::ScheduleStartTimeRepository;
pub use setting::SettingRepository;
pub use traits::Repository;
