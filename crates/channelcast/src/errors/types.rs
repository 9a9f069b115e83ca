//! Error type definitions shared across the runtime, persistence, and web layers.

use thiserror::Error;

/// Top-level error produced by the channel runtime and its components.
///
/// Every error kind named in the design (`NotFound`, `Conflict`, `Validation`,
/// `NoMedia`, `InvalidState`, `IoFailure`, `Fatal`) has a variant here so that
/// callers can match on *why* an operation failed rather than parsing a message.
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Channel/bucket/block/media id absent.
    #[error("not found: {resource} {id}")]
    NotFound { resource: String, id: String },

    /// Slug collision, illegal state transition, adapter already active, admission cap reached.
    #[error("conflict: {message}")]
    Conflict { message: String },

    /// Bad slug, bad time format, endTime <= startTime, out-of-range index, ...
    #[error("validation failed: {message}")]
    Validation { message: String },

    /// The playlist resolver returned an empty media list.
    #[error("no media available for channel {channel_id}")]
    NoMedia { channel_id: String },

    /// An unsupported state-machine edge was attempted.
    #[error("invalid state transition: {from} -> {to}")]
    InvalidState { from: String, to: String },

    /// Disk or subprocess I/O error.
    #[error("io failure: {message}")]
    IoFailure { message: String },

    /// Process-level startup failure.
    #[error("fatal startup error: {message}")]
    Fatal { message: String },

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("transcoder error: {0}")]
    Transcoder(String),
}

impl RuntimeError {
    pub fn not_found<R: Into<String>, I: Into<String>>(resource: R, id: I) -> Self {
        Self::NotFound { resource: resource.into(), id: id.into() }
    }

    pub fn conflict<S: Into<String>>(message: S) -> Self {
        Self::Conflict { message: message.into() }
    }

    pub fn validation<S: Into<String>>(message: S) -> Self {
        Self::Validation { message: message.into() }
    }

    pub fn no_media<S: Into<String>>(channel_id: S) -> Self {
        Self::NoMedia { channel_id: channel_id.into() }
    }

    pub fn invalid_state<S: Into<String>>(from: S, to: S) -> Self {
        Self::InvalidState { from: from.into(), to: to.into() }
    }

    pub fn io_failure<S: Into<String>>(message: S) -> Self {
        Self::IoFailure { message: message.into() }
    }

    pub fn fatal<S: Into<String>>(message: S) -> Self {
        Self::Fatal { message: message.into() }
    }

    /// True for errors that are "optional step" failures: logged and swallowed
    /// rather than surfaced to the caller (bumper generation, cache writes).
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::IoFailure { .. })
    }
}

/// Errors from the persistence layer (repository trait implementations).
#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("database connection failed: {0}")]
    ConnectionFailed(String),

    #[error("query failed: {0}")]
    QueryFailed(String),

    #[error(transparent)]
    Database(#[from] sea_orm::DbErr),

    #[error("invalid uuid: {0}")]
    UuidParse(#[from] uuid::Error),

    #[error("record not found: {entity} {id}")]
    NotFound { entity: String, id: String },

    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("migration failed: {0}")]
    MigrationFailed(String),
}

/// Errors surfaced at the thin HTTP boundary.
#[derive(Error, Debug)]
pub enum WebError {
    #[error("invalid request: {field} - {message}")]
    InvalidRequest { field: String, message: String },

    #[error("invalid segment name: {0}")]
    InvalidSegment(String),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl WebError {
    /// HTTP status mapping: Validation->400, NotFound->404, Conflict->409,
    /// NoMedia->400, InvalidState->409, IoFailure/unknown->500.
    pub fn status_code(&self) -> axum::http::StatusCode {
        use axum::http::StatusCode;
        match self {
            WebError::InvalidRequest { .. } | WebError::InvalidSegment(_) => StatusCode::BAD_REQUEST,
            WebError::Json(_) => StatusCode::BAD_REQUEST,
            WebError::Runtime(RuntimeError::Validation { .. }) => StatusCode::BAD_REQUEST,
            WebError::Runtime(RuntimeError::NoMedia { .. }) => StatusCode::BAD_REQUEST,
            WebError::Runtime(RuntimeError::NotFound { .. }) => StatusCode::NOT_FOUND,
            WebError::Runtime(RuntimeError::Conflict { .. }) => StatusCode::CONFLICT,
            WebError::Runtime(RuntimeError::InvalidState { .. }) => StatusCode::CONFLICT,
            WebError::Runtime(RuntimeError::Repository(RepositoryError::NotFound { .. })) => {
                StatusCode::NOT_FOUND
            }
            WebError::Runtime(RuntimeError::Repository(RepositoryError::ConstraintViolation(_))) => {
                StatusCode::CONFLICT
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            WebError::InvalidRequest { .. } | WebError::InvalidSegment(_) => "validation",
            WebError::Json(_) => "validation",
            WebError::Runtime(RuntimeError::Validation { .. }) => "validation",
            WebError::Runtime(RuntimeError::NoMedia { .. }) => "no_media",
            WebError::Runtime(RuntimeError::NotFound { .. }) => "not_found",
            WebError::Runtime(RuntimeError::Conflict { .. }) => "conflict",
            WebError::Runtime(RuntimeError::InvalidState { .. }) => "invalid_state",
            WebError::Runtime(RuntimeError::Repository(RepositoryError::NotFound { .. })) => {
                "not_found"
            }
            WebError::Runtime(RuntimeError::Repository(RepositoryError::ConstraintViolation(_))) => {
                "conflict"
            }
            _ => "internal",
        }
    }
}
