//! In-memory fake used by tests that exercise runtime orchestration without a
//! real `ffmpeg` binary, mirroring how the teacher tests relay lifecycle
//! against a stand-in process.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::errors::{AppResult, RuntimeError};

use super::{TranscodeConfig, TranscoderAdapter};

#[derive(Default)]
pub struct FakeTranscoderAdapter {
    active: Mutex<HashSet<Uuid>>,
}

impl FakeTranscoderAdapter {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TranscoderAdapter for FakeTranscoderAdapter {
    async fn start(&self, channel_id: Uuid, _config: TranscodeConfig) -> AppResult<()> {
        let mut active = self.active.lock().unwrap();
        if !active.insert(channel_id) {
            return Err(RuntimeError::conflict(format!(
                "transcoder already active for channel {channel_id}"
            )));
        }
        Ok(())
    }

    async fn stop(&self, channel_id: Uuid) -> AppResult<()> {
        self.active.lock().unwrap().remove(&channel_id);
        Ok(())
    }

    async fn is_active(&self, channel_id: Uuid) -> bool {
        self.active.lock().unwrap().contains(&channel_id)
    }

    async fn cleanup(&self) -> AppResult<()> {
        self.active.lock().unwrap().clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn config() -> TranscodeConfig {
        TranscodeConfig {
            concat_file: PathBuf::from("/tmp/concat.txt"),
            output_dir: PathBuf::from("/tmp/out"),
            video_bitrate_kbps: 4000,
            audio_bitrate_kbps: 192,
            resolution: "1920x1080".to_string(),
            fps: 30,
            segment_duration: 6,
            start_position_seconds: 0.0,
            hwaccel: crate::config::HwAccel::None,
        }
    }

    #[tokio::test]
    async fn rejects_double_start() {
        let adapter = FakeTranscoderAdapter::new();
        let channel_id = Uuid::new_v4();
        adapter.start(channel_id, config()).await.unwrap();
        assert!(adapter.start(channel_id, config()).await.is_err());
        assert!(adapter.is_active(channel_id).await);
    }

    #[tokio::test]
    async fn stop_is_idempotent() {
        let adapter = FakeTranscoderAdapter::new();
        let channel_id = Uuid::new_v4();
        adapter.stop(channel_id).await.unwrap();
        adapter.start(channel_id, config()).await.unwrap();
        adapter.stop(channel_id).await.unwrap();
        adapter.stop(channel_id).await.unwrap();
        assert!(!adapter.is_active(channel_id).await);
    }
}
