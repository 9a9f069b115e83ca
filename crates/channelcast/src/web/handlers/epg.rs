//! EPG endpoints: per-channel program list, now/next, refresh, and the
//! all-channels XMLTV export.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::database::repositories::Repository;
use crate::epg::export_xmltv;
use crate::errors::{RuntimeError, WebResult};
use crate::web::responses::ok;
use crate::web::AppState;

async fn programs_for(state: &AppState, channel_id: Uuid) -> WebResult<(crate::models::Channel, Vec<crate::models::EpgProgram>)> {
    let channel = state
        .channels
        .find_by_id(&channel_id)
        .await
        .map_err(RuntimeError::from)?
        .ok_or_else(|| RuntimeError::not_found("channel", channel_id.to_string()))?;

    let schedule_start = state
        .schedule_timeline
        .get(channel_id)
        .await?
        .unwrap_or_else(Utc::now);

    let programs = state
        .epg
        .generate_programs(&channel, schedule_start, &state.playlist_resolver, None)
        .await?;
    Ok((channel, programs))
}

pub async fn channel_programs(
    State(state): State<AppState>,
    Path(channel_id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let (_, programs) = programs_for(&state, channel_id).await?;
    Ok(ok(programs))
}

pub async fn current_and_next(
    State(state): State<AppState>,
    Path(channel_id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    programs_for(&state, channel_id).await?;
    let (current, next) = state.epg.get_current_and_next(channel_id, Utc::now());
    Ok(ok(json!({ "current": current, "next": next })))
}

pub async fn refresh(
    State(state): State<AppState>,
    Path(channel_id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    state.epg.invalidate(channel_id);
    let (_, programs) = programs_for(&state, channel_id).await?;
    Ok(ok(programs))
}

pub async fn xmltv(State(state): State<AppState>) -> WebResult<impl IntoResponse> {
    let channels = state.channels.find_all().await.map_err(RuntimeError::from)?;
    let mut entries = Vec::with_capacity(channels.len());
    for channel in channels {
        let id = channel.id;
        let (channel, programs) = programs_for(&state, id).await.unwrap_or((channel, Vec::new()));
        entries.push((channel, programs));
    }
    let xml = export_xmltv(&entries)?;
    Ok(([(axum::http::header::CONTENT_TYPE, "application/xml")], xml))
}
