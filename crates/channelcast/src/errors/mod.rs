//! Centralized error handling for the channel runtime.
//!
//! Mirrors a layered taxonomy: a top-level `RuntimeError` for the orchestrator
//! and its components, a `RepositoryError` for the persistence layer, and a
//! `WebError` for the thin HTTP shims, all convertible into one another.
//!
//! ```
//! use channelcast::errors::AppResult;
//!
//! fn example() -> AppResult<String> {
//!     Ok("ok".to_string())
//! }
//! ```

pub mod types;

pub use types::*;

pub type AppResult<T> = Result<T, RuntimeError>;
pub type RepositoryResult<T> = Result<T, RepositoryError>;
pub type WebResult<T> = Result<T, WebError>;
