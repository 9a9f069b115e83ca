//! SeaORM entity definitions, one module per persisted table (§3.1).

pub mod bucket_media;
pub mod bucket_progression;
pub mod buckets;
pub mod channel_buckets;
pub mod channels;
pub mod media_files;
pub mod playback_sessions;
pub mod schedule_blocks;
pub mod schedule_start_times;
pub mod settings;

pub use bucket_media::Entity as BucketMedia;
pub use bucket_progression::Entity as BucketProgression;
pub use buckets::Entity as Buckets;
pub use channel_buckets::Entity as ChannelBuckets;
pub use channels::Entity as Channels;
pub use media_files::Entity as MediaFiles;
pub use playback_sessions::Entity as PlaybackSessions;
pub use schedule_blocks::Entity as ScheduleBlocks;
pub use schedule_start_times::Entity as ScheduleStartTimes;
pub use settings::Entity as Settings;
