//! Transcoder Adapter: black-box contract over whatever process turns a
//! concat manifest into HLS segments. Production uses a real `ffmpeg`
//! subprocess; tests use an in-memory fake.

mod ffmpeg;
mod fake;

pub use ffmpeg::FfmpegTranscoderAdapter;
pub use fake::FakeTranscoderAdapter;

use async_trait::async_trait;
use std::path::PathBuf;
use uuid::Uuid;

use crate::config::HwAccel;
use crate::errors::AppResult;

#[derive(Debug, Clone)]
pub struct TranscodeConfig {
    pub concat_file: PathBuf,
    pub output_dir: PathBuf,
    pub video_bitrate_kbps: u32,
    pub audio_bitrate_kbps: u32,
    pub resolution: String,
    pub fps: u32,
    pub segment_duration: u32,
    pub start_position_seconds: f64,
    pub hwaccel: HwAccel,
}

/// One encoder per channel at a time; `start` must not be called while
/// `is_active` is true for that channel.
#[async_trait]
pub trait TranscoderAdapter: Send + Sync {
    async fn start(&self, channel_id: Uuid, config: TranscodeConfig) -> AppResult<()>;
    async fn stop(&self, channel_id: Uuid) -> AppResult<()>;
    async fn is_active(&self, channel_id: Uuid) -> bool;
    async fn cleanup(&self) -> AppResult<()>;
}
