//! Bumper Generator: synthesizes a short "Up Next" interstitial clip and
//! writes it atomically so the transcoder never reads a half-written file.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{SystemTime, UNIX_EPOCH};

use tokio::process::Command as TokioCommand;
use tracing::warn;

use crate::errors::{AppResult, RuntimeError};
use crate::observability::RuntimeObservability;

pub const MIN_BUMPER_SIZE_BYTES: u64 = crate::config::defaults::DEFAULT_BUMPER_MIN_SIZE_BYTES;

#[derive(Debug, Clone)]
pub struct BumperSpec {
    pub show_name: String,
    pub episode_title: String,
    pub duration_seconds: f64,
    pub resolution: String,
    pub fps: u32,
    pub video_bitrate_kbps: u32,
    pub audio_bitrate_kbps: u32,
}

pub struct BumperGenerator {
    ffmpeg_command: String,
}

impl BumperGenerator {
    pub fn new(ffmpeg_command: impl Into<String>) -> Self {
        Self {
            ffmpeg_command: ffmpeg_command.into(),
        }
    }

    /// Renders `spec` to `out_path`, writing to a temp sibling first and
    /// renaming into place. Failures are non-fatal: callers must tolerate a
    /// missing bumper and keep streaming without one.
    pub async fn generate(
        &self,
        spec: &BumperSpec,
        out_path: &Path,
        observability: Option<&RuntimeObservability>,
    ) -> AppResult<()> {
        let start = std::time::Instant::now();
        let result = self.generate_inner(spec, out_path).await;

        if let Some(obs) = observability {
            obs.bumper_generation_duration_ms
                .record(start.elapsed().as_secs_f64() * 1000.0, &[]);
            if result.is_err() {
                obs.bumper_generation_failures.add(1, &[]);
            }
        }
        result
    }

    async fn generate_inner(&self, spec: &BumperSpec, out_path: &Path) -> AppResult<()> {
        let tmp_path = tmp_sibling(out_path);
        let text = drawtext(&spec.show_name, &spec.episode_title);

        let status = TokioCommand::new(&self.ffmpeg_command)
            .arg("-y")
            .arg("-f")
            .arg("lavfi")
            .arg("-i")
            .arg(format!(
                "color=c=black:s={}:r={}:d={:.3}",
                spec.resolution, spec.fps, spec.duration_seconds
            ))
            .arg("-f")
            .arg("lavfi")
            .arg("-i")
            .arg(format!("anullsrc=r=48000:cl=stereo:d={:.3}", spec.duration_seconds))
            .arg("-vf")
            .arg(text)
            .arg("-c:v")
            .arg("libx264")
            .arg("-b:v")
            .arg(format!("{}k", spec.video_bitrate_kbps))
            .arg("-c:a")
            .arg("aac")
            .arg("-b:a")
            .arg(format!("{}k", spec.audio_bitrate_kbps))
            .arg("-shortest")
            .arg(&tmp_path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|e| RuntimeError::io_failure(format!("failed to spawn bumper encoder: {e}")))?;

        if !status.success() {
            let _ = tokio::fs::remove_file(&tmp_path).await;
            return Err(RuntimeError::io_failure(format!(
                "bumper encoder exited with {status}"
            )));
        }

        sync_file(&tmp_path).await?;

        tokio::fs::rename(&tmp_path, out_path)
            .await
            .map_err(|e| RuntimeError::io_failure(format!("failed to rename bumper into place: {e}")))?;

        Ok(())
    }

    /// Best-effort fallback when the real render fails twice: a minimal
    /// "Loading…" placeholder. Failures here are swallowed by the caller.
    pub async fn generate_placeholder(&self, out_path: &Path) -> AppResult<()> {
        let spec = BumperSpec {
            show_name: "Loading".to_string(),
            episode_title: String::new(),
            duration_seconds: 3.0,
            resolution: "1280x720".to_string(),
            fps: 30,
            video_bitrate_kbps: 1000,
            audio_bitrate_kbps: 96,
        };
        self.generate_inner(&spec, out_path).await
    }
}

fn drawtext(show_name: &str, episode_title: &str) -> String {
    let label = if episode_title.is_empty() {
        format!("Up Next: {show_name}")
    } else {
        format!("Up Next: {show_name} - {episode_title}")
    };
    let escaped = label.replace('\\', "\\\\").replace(':', "\\:").replace('\'', "\\'");
    format!(
        "drawtext=text='{escaped}':fontcolor=white:fontsize=48:x=(w-text_w)/2:y=(h-text_h)/2"
    )
}

fn tmp_sibling(out_path: &Path) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let mut name = out_path.file_name().and_then(|n| n.to_str()).unwrap_or("bumper.mp4").to_string();
    name.push_str(&format!(".tmp.{nanos}"));
    out_path.with_file_name(name)
}

async fn sync_file(path: &Path) -> AppResult<()> {
    let file = tokio::fs::File::open(path)
        .await
        .map_err(|e| RuntimeError::io_failure(format!("failed to open bumper for fsync: {e}")))?;
    file.sync_all()
        .await
        .map_err(|e| RuntimeError::io_failure(format!("failed to fsync bumper: {e}")))
}

/// Whether `path` is a usable bumper: exists, at least [`MIN_BUMPER_SIZE_BYTES`],
/// and has no `.tmp.*` sibling currently being written.
pub async fn is_usable(path: &Path) -> bool {
    let Ok(metadata) = tokio::fs::metadata(path).await else {
        return false;
    };
    if metadata.len() < MIN_BUMPER_SIZE_BYTES {
        return false;
    }
    !has_tmp_sibling(path).await
}

async fn has_tmp_sibling(path: &Path) -> bool {
    let Some(dir) = path.parent() else { return false };
    let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
        return false;
    };
    let prefix = format!("{name}.tmp.");
    let Ok(mut entries) = tokio::fs::read_dir(dir).await else {
        return false;
    };
    while let Ok(Some(entry)) = entries.next_entry().await {
        if entry.file_name().to_str().map(|n| n.starts_with(&prefix)).unwrap_or(false) {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tmp_sibling_is_distinguishable_from_final_path() {
        let out = PathBuf::from("/data/channel/bumper.mp4");
        let tmp = tmp_sibling(&out);
        assert!(tmp.to_string_lossy().starts_with("/data/channel/bumper.mp4.tmp."));
        assert_ne!(tmp, out);
    }

    #[test]
    fn drawtext_escapes_colons_for_ffmpeg_filter_syntax() {
        let filter = drawtext("News at 10:00", "Segment A");
        assert!(filter.contains("10\\:00"));
    }
}
