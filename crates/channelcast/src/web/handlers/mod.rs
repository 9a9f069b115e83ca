pub mod buckets;
pub mod channels;
pub mod epg;
pub mod health;
pub mod schedule_blocks;
pub mod streaming;
