//! Schedule-block CRUD, scoped per channel for creation/listing.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use chrono::NaiveTime;
use serde::Deserialize;
use uuid::Uuid;

use crate::database::repositories::schedule_block::{
    ScheduleBlockCreateRequest, ScheduleBlockUpdateRequest,
};
use crate::database::repositories::Repository;
use crate::errors::{RuntimeError, WebResult};
use crate::models::PlaybackMode;
use crate::web::responses::{created, no_content, ok};
use crate::web::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateScheduleBlockBody {
    pub day_of_week: Vec<u8>,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub bucket_id: Uuid,
    pub playback_mode: PlaybackMode,
    #[serde(default = "default_priority")]
    pub priority: i32,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_priority() -> i32 {
    1
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct UpdateScheduleBlockBody {
    pub enabled: Option<bool>,
    pub priority: Option<i32>,
}

pub async fn list_for_channel(
    State(state): State<AppState>,
    Path(channel_id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let blocks = state
        .schedule_blocks
        .find_for_channel(channel_id)
        .await
        .map_err(RuntimeError::from)?;
    Ok(ok(blocks))
}

pub async fn create(
    State(state): State<AppState>,
    Path(channel_id): Path<Uuid>,
    Json(body): Json<CreateScheduleBlockBody>,
) -> WebResult<impl IntoResponse> {
    if body.end_time <= body.start_time {
        return Err(RuntimeError::validation("endTime must be after startTime").into());
    }
    let block = state
        .schedule_blocks
        .create(ScheduleBlockCreateRequest {
            channel_id,
            day_of_week: body.day_of_week,
            start_time: body.start_time,
            end_time: body.end_time,
            bucket_id: body.bucket_id,
            playback_mode: body.playback_mode,
            priority: body.priority,
            enabled: body.enabled,
        })
        .await
        .map_err(RuntimeError::from)?;
    state.runtime.invalidate_channel_media_cache(channel_id).await?;
    Ok(created(block))
}

pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateScheduleBlockBody>,
) -> WebResult<impl IntoResponse> {
    let block = state
        .schedule_blocks
        .update(
            &id,
            ScheduleBlockUpdateRequest { enabled: body.enabled, priority: body.priority },
        )
        .await
        .map_err(RuntimeError::from)?;
    state.runtime.invalidate_channel_media_cache(block.channel_id).await?;
    Ok(ok(block))
}

pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let block = state
        .schedule_blocks
        .find_by_id(&id)
        .await
        .map_err(RuntimeError::from)?
        .ok_or_else(|| RuntimeError::not_found("schedule_block", id.to_string()))?;
    state.schedule_blocks.delete(&id).await.map_err(RuntimeError::from)?;
    state.runtime.invalidate_channel_media_cache(block.channel_id).await?;
    Ok(no_content())
}
