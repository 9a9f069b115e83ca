//! Streaming endpoints: master/media playlists and segment files, read
//! straight from the channel's output directory. The transcoder is the only
//! writer; these handlers only read and touch viewer presence.

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use uuid::Uuid;

use crate::database::repositories::Repository;
use crate::errors::{RuntimeError, WebResult};
use crate::utils::{derive_session_id, validate_segment_name};
use crate::web::extractors::{RequestContext, ValidatedSlug};
use crate::web::AppState;

async fn find_channel_by_slug(state: &AppState, slug: &str) -> WebResult<crate::models::Channel> {
    state
        .channels
        .find_by_slug(slug)
        .await
        .map_err(RuntimeError::from)?
        .ok_or_else(|| RuntimeError::not_found("channel", slug.to_string()).into())
}

fn touch_viewer(state: &AppState, channel_id: Uuid, ctx: &RequestContext) {
    let session_id = derive_session_id(ctx.real_ip.as_deref().unwrap_or("unknown"), ctx.user_agent.as_deref());
    let tracker = state.viewer_tracker.clone();
    tokio::spawn(async move {
        tracker.touch(channel_id, &session_id).await;
    });
}

async fn read_file(path: std::path::PathBuf, content_type: &'static str) -> Response {
    match tokio::fs::read(&path).await {
        Ok(bytes) => ([(header::CONTENT_TYPE, content_type)], bytes).into_response(),
        Err(_) => StatusCode::NOT_FOUND.into_response(),
    }
}

/// A single-variant HLS master playlist pointing at `stream.m3u8`.
pub async fn master_playlist(
    State(state): State<AppState>,
    ValidatedSlug(slug): ValidatedSlug,
    ctx: RequestContext,
) -> WebResult<impl IntoResponse> {
    let channel = find_channel_by_slug(&state, &slug).await?;
    touch_viewer(&state, channel.id, &ctx);

    let bandwidth = channel.config.video_bitrate_kbps as u64 * 1000
        + channel.config.audio_bitrate_kbps as u64 * 1000;
    let playlist = format!(
        "#EXTM3U\n#EXT-X-STREAM-INF:BANDWIDTH={bandwidth},RESOLUTION={}\nstream.m3u8\n",
        channel.config.resolution
    );
    Ok(([(header::CONTENT_TYPE, "application/vnd.apple.mpegurl")], playlist))
}

pub async fn stream_playlist(
    State(state): State<AppState>,
    ValidatedSlug(slug): ValidatedSlug,
    ctx: RequestContext,
) -> WebResult<impl IntoResponse> {
    let channel = find_channel_by_slug(&state, &slug).await?;
    touch_viewer(&state, channel.id, &ctx);

    let path = std::path::Path::new(&channel.output_dir).join("stream.m3u8");
    Ok(read_file(path, "application/vnd.apple.mpegurl").await)
}

pub async fn segment(
    State(state): State<AppState>,
    Path((slug, segment)): Path<(String, String)>,
    ctx: RequestContext,
) -> WebResult<impl IntoResponse> {
    crate::utils::validate_slug(&slug)?;
    validate_segment_name(&segment)?;

    let channel = find_channel_by_slug(&state, &slug).await?;
    touch_viewer(&state, channel.id, &ctx);

    let path = std::path::Path::new(&channel.output_dir).join(&segment);
    Ok(read_file(path, "video/mp2t").await)
}
