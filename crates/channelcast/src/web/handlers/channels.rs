//! Channel CRUD and lifecycle (start/stop/restart/next/index/schedule-time).

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::database::repositories::channel::{ChannelCreateRequest, ChannelUpdateRequest};
use crate::database::repositories::Repository;
use crate::errors::{RuntimeError, WebError, WebResult};
use crate::models::ChannelConfig;
use crate::web::responses::{created, no_content, ok};
use crate::web::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateChannelBody {
    pub slug: String,
    pub name: String,
    pub output_dir: String,
    #[serde(default)]
    pub config: Option<ChannelConfig>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateChannelBody {
    pub name: Option<String>,
    pub config: Option<ChannelConfig>,
}

#[derive(Debug, Deserialize)]
pub struct SetIndexBody {
    pub index: usize,
}

#[derive(Debug, Deserialize)]
pub struct SetScheduleTimeBody {
    pub started_at: DateTime<Utc>,
}

pub async fn list_channels(State(state): State<AppState>) -> WebResult<impl IntoResponse> {
    let channels = state.channels.find_all().await.map_err(RuntimeError::from)?;
    Ok(ok(channels))
}

pub async fn get_channel(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let channel = state
        .channels
        .find_by_id(&id)
        .await
        .map_err(RuntimeError::from)?
        .ok_or_else(|| WebError::Runtime(RuntimeError::not_found("channel", id.to_string())))?;
    Ok(ok(channel))
}

pub async fn create_channel(
    State(state): State<AppState>,
    Json(body): Json<CreateChannelBody>,
) -> WebResult<impl IntoResponse> {
    crate::utils::validate_slug(&body.slug)?;
    if state.channels.find_by_slug(&body.slug).await.map_err(RuntimeError::from)?.is_some() {
        return Err(WebError::Runtime(RuntimeError::conflict(format!(
            "channel slug '{}' already exists",
            body.slug
        ))));
    }
    let channel = state
        .channels
        .create(ChannelCreateRequest {
            slug: body.slug,
            name: body.name,
            output_dir: body.output_dir,
            config: body.config.unwrap_or_default(),
        })
        .await
        .map_err(RuntimeError::from)?;
    Ok(created(channel))
}

pub async fn update_channel(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateChannelBody>,
) -> WebResult<impl IntoResponse> {
    let channel = state
        .channels
        .update(
            &id,
            ChannelUpdateRequest {
                name: body.name,
                config: body.config,
                state: None,
                current_index: None,
                viewer_count: None,
                started_at: None,
                last_error: None,
            },
        )
        .await
        .map_err(RuntimeError::from)?;
    if channel.state == crate::models::ChannelState::Streaming {
        state.runtime.invalidate_channel_media_cache(id).await?;
    }
    Ok(ok(channel))
}

pub async fn delete_channel(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    state.runtime.stop(id).await?;
    state.channels.delete(&id).await.map_err(RuntimeError::from)?;
    Ok(no_content())
}

pub async fn start_channel(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    state.runtime.start(id, None, false).await?;
    Ok(no_content())
}

pub async fn stop_channel(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    state.runtime.stop(id).await?;
    Ok(no_content())
}

pub async fn restart_channel(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    state.runtime.restart(id).await?;
    Ok(no_content())
}

/// Advances to the next media item, wrapping around the resolved playlist.
pub async fn next_media(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let channel = state
        .channels
        .find_by_id(&id)
        .await
        .map_err(RuntimeError::from)?
        .ok_or_else(|| WebError::Runtime(RuntimeError::not_found("channel", id.to_string())))?;

    let media = state
        .playlist_resolver
        .resolve_media(
            &channel,
            &crate::playlist::ResolveContext {
                current_time: Utc::now(),
                current_index: Some(channel.metadata.current_index),
            },
        )
        .await?;
    if media.is_empty() {
        return Err(WebError::Runtime(RuntimeError::no_media(id.to_string())));
    }
    let next_index = (channel.metadata.current_index + 1) % media.len();
    state.runtime.start(id, Some(next_index), true).await?;
    Ok(no_content())
}

pub async fn set_index(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<SetIndexBody>,
) -> WebResult<impl IntoResponse> {
    let channel = state
        .channels
        .find_by_id(&id)
        .await
        .map_err(RuntimeError::from)?
        .ok_or_else(|| WebError::Runtime(RuntimeError::not_found("channel", id.to_string())))?;

    if channel.state == crate::models::ChannelState::Streaming {
        state.runtime.start(id, Some(body.index), true).await?;
    } else {
        state
            .channels
            .update(
                &id,
                ChannelUpdateRequest {
                    name: None,
                    config: None,
                    state: None,
                    current_index: Some(body.index),
                    viewer_count: None,
                    started_at: None,
                    last_error: None,
                },
            )
            .await
            .map_err(RuntimeError::from)?;
    }
    Ok(no_content())
}

/// Operator rewind/fast-forward of the schedule anchor.
pub async fn set_schedule_time(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<SetScheduleTimeBody>,
) -> WebResult<impl IntoResponse> {
    state.schedule_timeline.set(id, body.started_at).await?;
    Ok(no_content())
}
