//! HTTP response types and error mapping.
//!
//! Every endpoint returns the same envelope: `{success, data?, error?}` with a
//! status code derived from [`WebError::status_code`].

use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;

use crate::errors::{WebError, WebResult};

#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ApiError>,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub code: &'static str,
    pub message: String,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self { success: true, data: Some(data), error: None }
    }
}

/// Turns any `WebResult<T>` into a response with the right status code.
pub fn handle_result<T: Serialize>(result: WebResult<T>) -> axum::response::Response {
    match result {
        Ok(data) => (StatusCode::OK, Json(ApiResponse::success(data))).into_response(),
        Err(err) => handle_error(err).into_response(),
    }
}

pub fn ok<T: Serialize>(data: T) -> axum::response::Response {
    (StatusCode::OK, Json(ApiResponse::success(data))).into_response()
}

pub fn created<T: Serialize>(data: T) -> axum::response::Response {
    (StatusCode::CREATED, Json(ApiResponse::success(data))).into_response()
}

pub fn no_content() -> axum::response::Response {
    StatusCode::NO_CONTENT.into_response()
}

pub fn handle_error(err: WebError) -> axum::response::Response {
    let status = err.status_code();
    let body = ApiResponse::<()> {
        success: false,
        data: None,
        error: Some(ApiError { code: err.code(), message: err.to_string() }),
    };
    (status, Json(body)).into_response()
}

impl IntoResponse for WebError {
    fn into_response(self) -> axum::response::Response {
        handle_error(self)
    }
}
