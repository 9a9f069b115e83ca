//! Typed configuration tree, loaded through `figment` (TOML file + environment
//! overlay), following the same `defaults.rs` constant-table convention used
//! throughout the rest of the ambient stack.

pub mod defaults;
pub mod duration_serde;

use figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use serde::{Deserialize, Serialize};

use crate::errors::{AppResult, RuntimeError};
use defaults::*;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub web: WebConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub streaming: StreamingConfig,
    #[serde(default)]
    pub viewer: ViewerConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load from a TOML file, overlaid with `CHANNELCAST_`-prefixed environment
    /// variables (`CHANNELCAST_WEB.PORT`, nested with `.` as separator).
    pub fn load_from_file(path: &str) -> AppResult<Self> {
        let figment = Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("CHANNELCAST_").split("__"));

        figment
            .extract()
            .map_err(|e| RuntimeError::fatal(format!("failed to load configuration: {e}")))
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            web: WebConfig::default(),
            database: DatabaseConfig::default(),
            storage: StorageConfig::default(),
            streaming: StreamingConfig::default(),
            viewer: ViewerConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_server_url() -> Option<String> {
    None
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Bind address recognized as `serverUrl` in the external interface; when
    /// absent, handlers fall back to `host`/`port`.
    #[serde(default = "default_server_url")]
    pub server_url: Option<String>,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            server_url: default_server_url(),
        }
    }
}

fn default_database_url() -> String {
    DEFAULT_DATABASE_URL.to_string()
}
fn default_max_connections() -> u32 {
    DEFAULT_MAX_CONNECTIONS
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            max_connections: default_max_connections(),
        }
    }
}

fn default_data_path() -> String {
    DEFAULT_DATA_PATH.to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Parent directory under which each channel's output directory
    /// (`<data_path>/<slug>/`) is created.
    #[serde(default = "default_data_path")]
    pub data_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_path: default_data_path(),
        }
    }
}

fn default_segment_duration() -> u32 {
    DEFAULT_SEGMENT_DURATION
}
fn default_include_bumpers() -> bool {
    DEFAULT_INCLUDE_BUMPERS
}
fn default_hwaccel() -> HwAccel {
    HwAccel::None
}
fn default_progression_tick_seconds() -> u64 {
    DEFAULT_PROGRESSION_TICK_SECONDS
}
fn default_stop_start_settle_ms() -> u64 {
    DEFAULT_STOP_START_SETTLE_MS
}
fn default_max_concurrent_streams() -> Option<usize> {
    None
}
fn default_auto_save_interval_seconds() -> u64 {
    DEFAULT_AUTO_SAVE_INTERVAL_SECONDS
}
fn default_ffmpeg_command() -> String {
    DEFAULT_FFMPEG_COMMAND.to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display, strum::EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum HwAccel {
    None,
    Nvenc,
    Qsv,
    Videotoolbox,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamingConfig {
    #[serde(default = "default_segment_duration")]
    pub segment_duration: u32,
    #[serde(default = "default_include_bumpers")]
    pub include_bumpers: bool,
    #[serde(default = "default_hwaccel")]
    pub hwaccel: HwAccel,
    /// Admission cap on simultaneously-STREAMING channels; `None` disables it.
    #[serde(default = "default_max_concurrent_streams")]
    pub max_concurrent_streams: Option<usize>,
    #[serde(default = "default_progression_tick_seconds")]
    pub progression_tick_seconds: u64,
    #[serde(default = "default_stop_start_settle_ms")]
    pub stop_start_settle_ms: u64,
    /// Optional period for the auto-save snapshot task; `None` disables it.
    #[serde(default)]
    pub auto_save: Option<AutoSaveConfig>,
    /// Binary name or path used to spawn the transcoder and bumper encoder.
    #[serde(default = "default_ffmpeg_command")]
    pub ffmpeg_command: String,
}

impl Default for StreamingConfig {
    fn default() -> Self {
        Self {
            segment_duration: default_segment_duration(),
            include_bumpers: default_include_bumpers(),
            hwaccel: default_hwaccel(),
            max_concurrent_streams: default_max_concurrent_streams(),
            progression_tick_seconds: default_progression_tick_seconds(),
            stop_start_settle_ms: default_stop_start_settle_ms(),
            auto_save: Some(AutoSaveConfig::default()),
            ffmpeg_command: default_ffmpeg_command(),
        }
    }
}

impl StreamingConfig {
    pub fn validate(&self) -> AppResult<()> {
        if !(1..=30).contains(&self.segment_duration) {
            return Err(RuntimeError::validation(format!(
                "segmentDuration must be in 1..=30, got {}",
                self.segment_duration
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutoSaveConfig {
    #[serde(default = "default_auto_save_interval_seconds")]
    pub interval_seconds: u64,
}

impl Default for AutoSaveConfig {
    fn default() -> Self {
        Self {
            interval_seconds: default_auto_save_interval_seconds(),
        }
    }
}

fn default_viewer_session_idle_timeout() -> u64 {
    DEFAULT_VIEWER_SESSION_IDLE_TIMEOUT_SECONDS
}
fn default_viewer_disconnect_grace_period() -> u64 {
    DEFAULT_VIEWER_DISCONNECT_GRACE_PERIOD_SECONDS
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewerConfig {
    #[serde(default = "default_viewer_session_idle_timeout")]
    pub session_idle_timeout_seconds: u64,
    #[serde(default = "default_viewer_disconnect_grace_period")]
    pub disconnect_grace_period_seconds: u64,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            session_idle_timeout_seconds: default_viewer_session_idle_timeout(),
            disconnect_grace_period_seconds: default_viewer_disconnect_grace_period(),
        }
    }
}

fn default_service_name() -> String {
    "channelcast".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_service_name")]
    pub service_name: String,
    /// When set, traces/metrics are also exported via OTLP to this endpoint
    /// (mirrors the `OTEL_EXPORTER_OTLP_ENDPOINT` environment convention).
    #[serde(default)]
    pub otlp_endpoint: Option<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            service_name: default_service_name(),
            otlp_endpoint: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_internally_consistent() {
        let config = Config::default();
        assert_eq!(config.web.port, DEFAULT_PORT);
        assert!(config.streaming.validate().is_ok());
    }

    #[test]
    fn rejects_out_of_range_segment_duration() {
        let mut streaming = StreamingConfig::default();
        streaming.segment_duration = 0;
        assert!(streaming.validate().is_err());
        streaming.segment_duration = 31;
        assert!(streaming.validate().is_err());
    }
}
