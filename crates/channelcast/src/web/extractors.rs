//! Request-boundary extractors shared by the streaming and channel handlers.

use axum::{
    extract::{FromRequestParts, Path},
    http::request::Parts,
};

use crate::errors::WebError;
use crate::utils::validation::validate_slug;

/// A path segment already checked against `^[a-z0-9-]+$`.
pub struct ValidatedSlug(pub String);

impl<S> FromRequestParts<S> for ValidatedSlug
where
    S: Send + Sync,
{
    type Rejection = WebError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(slug) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|e| WebError::InvalidRequest { field: "slug".to_string(), message: e.to_string() })?;
        validate_slug(&slug)?;
        Ok(Self(slug))
    }
}

/// Client address and user-agent, used to derive an anonymous viewer session id.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    pub user_agent: Option<String>,
    pub real_ip: Option<String>,
}

impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user_agent = parts
            .headers
            .get("user-agent")
            .and_then(|h| h.to_str().ok())
            .map(|s| s.to_string());

        let real_ip = parts
            .headers
            .get("x-real-ip")
            .or_else(|| parts.headers.get("x-forwarded-for"))
            .and_then(|h| h.to_str().ok())
            .map(|s| s.split(',').next().unwrap_or(s).trim().to_string());

        Ok(Self { user_agent, real_ip })
    }
}
