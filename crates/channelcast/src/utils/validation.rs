//! Request-boundary validation: channel slugs and streaming segment names.

use std::sync::LazyLock;

use regex::Regex;

use crate::errors::{RuntimeError, WebError};

static SLUG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[a-z0-9-]+$").unwrap());
static SEGMENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^stream_\d+\.ts$").unwrap());

pub fn validate_slug(slug: &str) -> Result<(), RuntimeError> {
    if SLUG_RE.is_match(slug) {
        Ok(())
    } else {
        Err(RuntimeError::validation(format!(
            "slug '{slug}' must match ^[a-z0-9-]+$"
        )))
    }
}

/// Segment names must be `stream_<n>.ts` or the literal `starting.ts`
/// placeholder, and must never contain path traversal components.
pub fn validate_segment_name(name: &str) -> Result<(), WebError> {
    if name.contains("..") || name.contains('/') || name.contains('\\') {
        return Err(WebError::InvalidSegment(name.to_string()));
    }
    if name == "starting.ts" || SEGMENT_RE.is_match(name) {
        Ok(())
    } else {
        Err(WebError::InvalidSegment(name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_lowercase_dashed_slug() {
        assert!(validate_slug("news-24").is_ok());
    }

    #[test]
    fn rejects_uppercase_or_whitespace() {
        assert!(validate_slug("News 24").is_err());
    }

    #[test]
    fn accepts_numbered_segment() {
        assert!(validate_segment_name("stream_0042.ts").is_ok());
    }

    #[test]
    fn accepts_starting_placeholder() {
        assert!(validate_segment_name("starting.ts").is_ok());
    }

    #[test]
    fn rejects_path_traversal() {
        assert!(validate_segment_name("../../etc/passwd").is_err());
        assert!(validate_segment_name("sub/stream_1.ts").is_err());
    }

    #[test]
    fn rejects_wrong_extension() {
        assert!(validate_segment_name("stream_1.mp4").is_err());
    }
}
