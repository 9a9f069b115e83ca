//! Configuration default values.
//!
//! Central table of constants so defaults are changeable in one place instead
//! of scattered across `#[serde(default = "...")]` attributes.

// Database defaults
pub const DEFAULT_DATABASE_URL: &str = "sqlite://./channelcast.db?mode=rwc";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

// Web server defaults
pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;

// Storage defaults
pub const DEFAULT_DATA_PATH: &str = "./data/channels";

// Streaming defaults
pub const DEFAULT_SEGMENT_DURATION: u32 = 6;
pub const DEFAULT_INCLUDE_BUMPERS: bool = true;
pub const DEFAULT_HWACCEL: &str = "none";
pub const DEFAULT_PROGRESSION_TICK_SECONDS: u64 = 5;
pub const DEFAULT_STOP_START_SETTLE_MS: u64 = 300;

// Viewer presence defaults
pub const DEFAULT_VIEWER_SESSION_IDLE_TIMEOUT_SECONDS: u64 = 60;
pub const DEFAULT_VIEWER_DISCONNECT_GRACE_PERIOD_SECONDS: u64 = 45;

// Auto-save defaults
pub const DEFAULT_AUTO_SAVE_INTERVAL_SECONDS: u64 = 60;

// Bumper defaults
pub const DEFAULT_BUMPER_MIN_SIZE_BYTES: u64 = 1024;

// External tooling
pub const DEFAULT_FFMPEG_COMMAND: &str = "ffmpeg";
