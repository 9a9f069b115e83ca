//! Small reusable utilities shared across the web, runtime, and viewer layers.

pub mod session_id;
pub mod validation;

pub use session_id::derive_session_id;
pub use validation::{validate_segment_name, validate_slug};
