//! Real subprocess implementation, grounded in the teacher's
//! `FFmpegProcessWrapper`/`FFmpegProcess` handle pattern: one owned child
//! process per channel, killed on drop, with stderr drained to tracing.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command as TokioCommand};
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::HwAccel;
use crate::errors::{AppResult, RuntimeError};
use crate::observability::RuntimeObservability;

use super::{TranscodeConfig, TranscoderAdapter};

struct ActiveProcess {
    child: Child,
}

impl Drop for ActiveProcess {
    fn drop(&mut self) {
        if let Err(e) = self.child.start_kill() {
            warn!(error = %e, "failed to kill transcoder process on drop");
        }
    }
}

pub struct FfmpegTranscoderAdapter {
    ffmpeg_command: String,
    processes: Mutex<HashMap<Uuid, ActiveProcess>>,
    observability: Option<Arc<RuntimeObservability>>,
}

impl FfmpegTranscoderAdapter {
    pub fn new(ffmpeg_command: impl Into<String>, observability: Option<Arc<RuntimeObservability>>) -> Self {
        Self {
            ffmpeg_command: ffmpeg_command.into(),
            processes: Mutex::new(HashMap::new()),
            observability,
        }
    }

    fn build_args(config: &TranscodeConfig) -> Vec<String> {
        let mut args = vec![
            "-y".to_string(),
            "-f".to_string(),
            "concat".to_string(),
            "-safe".to_string(),
            "0".to_string(),
        ];

        if config.start_position_seconds > 0.0 {
            args.push("-ss".to_string());
            args.push(format!("{:.3}", config.start_position_seconds));
        }

        args.push("-i".to_string());
        args.push(config.concat_file.display().to_string());

        if let Some(hwaccel_args) = hwaccel_encoder_args(config.hwaccel) {
            args.extend(hwaccel_args);
        } else {
            args.push("-c:v".to_string());
            args.push("libx264".to_string());
        }

        args.push("-b:v".to_string());
        args.push(format!("{}k", config.video_bitrate_kbps));
        args.push("-s".to_string());
        args.push(config.resolution.clone());
        args.push("-r".to_string());
        args.push(config.fps.to_string());
        args.push("-c:a".to_string());
        args.push("aac".to_string());
        args.push("-b:a".to_string());
        args.push(format!("{}k", config.audio_bitrate_kbps));

        args.push("-f".to_string());
        args.push("hls".to_string());
        args.push("-hls_time".to_string());
        args.push(config.segment_duration.to_string());
        args.push("-hls_list_size".to_string());
        args.push("6".to_string());
        args.push("-hls_flags".to_string());
        args.push("delete_segments".to_string());
        args.push("-hls_segment_filename".to_string());
        args.push(config.output_dir.join("stream_%03d.ts").display().to_string());
        args.push(config.output_dir.join("stream.m3u8").display().to_string());

        args
    }
}

fn hwaccel_encoder_args(hwaccel: HwAccel) -> Option<Vec<String>> {
    match hwaccel {
        HwAccel::None => None,
        HwAccel::Nvenc => Some(vec!["-c:v".to_string(), "h264_nvenc".to_string()]),
        HwAccel::Qsv => Some(vec!["-c:v".to_string(), "h264_qsv".to_string()]),
        HwAccel::Videotoolbox => Some(vec!["-c:v".to_string(), "h264_videotoolbox".to_string()]),
    }
}

#[async_trait]
impl TranscoderAdapter for FfmpegTranscoderAdapter {
    async fn start(&self, channel_id: Uuid, config: TranscodeConfig) -> AppResult<()> {
        let mut processes = self.processes.lock().await;
        if processes.contains_key(&channel_id) {
            return Err(RuntimeError::conflict(format!(
                "transcoder already active for channel {channel_id}"
            )));
        }

        tokio::fs::create_dir_all(&config.output_dir)
            .await
            .map_err(|e| RuntimeError::io_failure(format!("failed to create output dir: {e}")))?;

        let args = Self::build_args(&config);
        let mut child = TokioCommand::new(&self.ffmpeg_command)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| RuntimeError::Transcoder(format!("failed to spawn ffmpeg: {e}")))?;

        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    if line.to_lowercase().contains("error") {
                        warn!(channel_id = %channel_id, "ffmpeg: {line}");
                    } else {
                        tracing::debug!(channel_id = %channel_id, "ffmpeg: {line}");
                    }
                }
            });
        }

        info!(channel_id = %channel_id, "started transcoder");
        if let Some(obs) = &self.observability {
            obs.transcoder_starts.add(1, &[]);
        }

        processes.insert(channel_id, ActiveProcess { child });
        Ok(())
    }

    async fn stop(&self, channel_id: Uuid) -> AppResult<()> {
        let mut processes = self.processes.lock().await;
        let Some(mut process) = processes.remove(&channel_id) else {
            return Ok(());
        };
        if let Err(e) = process.child.kill().await {
            warn!(channel_id = %channel_id, error = %e, "failed to kill transcoder, treating as already stopped");
        }
        if let Some(obs) = &self.observability {
            obs.transcoder_stops.add(1, &[]);
        }
        Ok(())
    }

    async fn is_active(&self, channel_id: Uuid) -> bool {
        let mut processes = self.processes.lock().await;
        let Some(process) = processes.get_mut(&channel_id) else {
            return false;
        };
        match process.child.try_wait() {
            Ok(Some(_)) => {
                processes.remove(&channel_id);
                false
            }
            Ok(None) => true,
            Err(_) => false,
        }
    }

    async fn cleanup(&self) -> AppResult<()> {
        let mut processes = self.processes.lock().await;
        for (channel_id, mut process) in processes.drain() {
            if let Err(e) = process.child.kill().await {
                warn!(channel_id = %channel_id, error = %e, "failed to kill transcoder during cleanup");
            }
        }
        Ok(())
    }
}
