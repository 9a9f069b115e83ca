//! Bucket CRUD, media library CRUD, and channel-bucket association.

use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::database::repositories::bucket::{BucketCreateRequest, BucketUpdateRequest};
use crate::database::repositories::media_file::{MediaFileCreateRequest, MediaFileUpdateRequest};
use crate::database::repositories::Repository;
use crate::errors::{RuntimeError, WebResult};
use crate::models::BucketType;
use crate::web::responses::{created, no_content, ok};
use crate::web::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateBucketBody {
    pub name: String,
    pub bucket_type: BucketType,
}

#[derive(Debug, Deserialize)]
pub struct UpdateBucketBody {
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddMediaBody {
    pub media_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct AssociateChannelBody {
    pub bucket_id: Uuid,
    #[serde(default = "default_priority")]
    pub priority: i32,
}

fn default_priority() -> i32 {
    1
}

#[derive(Debug, Deserialize)]
pub struct CreateMediaBody {
    pub path: String,
    pub filename: String,
    pub duration_seconds: f64,
    pub file_size: u64,
    pub show_name: Option<String>,
    pub season: Option<u32>,
    pub episode: Option<u32>,
    pub title: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateMediaBody {
    pub title: Option<String>,
}

pub async fn list_buckets(State(state): State<AppState>) -> WebResult<impl IntoResponse> {
    Ok(ok(state.buckets.find_all().await.map_err(RuntimeError::from)?))
}

pub async fn get_bucket(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let bucket = state
        .buckets
        .find_by_id(&id)
        .await
        .map_err(RuntimeError::from)?
        .ok_or_else(|| RuntimeError::not_found("bucket", id.to_string()))?;
    Ok(ok(bucket))
}

pub async fn create_bucket(
    State(state): State<AppState>,
    Json(body): Json<CreateBucketBody>,
) -> WebResult<impl IntoResponse> {
    let bucket = state
        .buckets
        .create(BucketCreateRequest { name: body.name, bucket_type: body.bucket_type })
        .await
        .map_err(RuntimeError::from)?;
    Ok(created(bucket))
}

pub async fn update_bucket(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateBucketBody>,
) -> WebResult<impl IntoResponse> {
    let bucket = state
        .buckets
        .update(&id, BucketUpdateRequest { name: body.name })
        .await
        .map_err(RuntimeError::from)?;
    Ok(ok(bucket))
}

pub async fn delete_bucket(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    state.buckets.delete(&id).await.map_err(RuntimeError::from)?;
    Ok(no_content())
}

pub async fn add_media(
    State(state): State<AppState>,
    Path(bucket_id): Path<Uuid>,
    Json(body): Json<AddMediaBody>,
) -> WebResult<impl IntoResponse> {
    state
        .buckets
        .add_member(bucket_id, body.media_id)
        .await
        .map_err(RuntimeError::from)?;
    Ok(no_content())
}

pub async fn remove_media(
    State(state): State<AppState>,
    Path((bucket_id, media_id)): Path<(Uuid, Uuid)>,
) -> WebResult<impl IntoResponse> {
    state
        .buckets
        .remove_member(bucket_id, media_id)
        .await
        .map_err(RuntimeError::from)?;
    Ok(no_content())
}

pub async fn list_channel_buckets(
    State(state): State<AppState>,
    Path(channel_id): Path<Uuid>,
) -> WebResult<impl IntoResponse> {
    let buckets = state
        .buckets
        .find_for_channel(channel_id)
        .await
        .map_err(RuntimeError::from)?;
    Ok(ok(buckets))
}

pub async fn associate_channel(
    State(state): State<AppState>,
    Path(channel_id): Path<Uuid>,
    Json(body): Json<AssociateChannelBody>,
) -> WebResult<impl IntoResponse> {
    state
        .buckets
        .associate_channel(channel_id, body.bucket_id, body.priority)
        .await
        .map_err(RuntimeError::from)?;
    state.runtime.invalidate_channel_media_cache(channel_id).await?;
    Ok(no_content())
}

pub async fn list_media(State(state): State<AppState>) -> WebResult<impl IntoResponse> {
    Ok(ok(state.media_files.find_all().await.map_err(RuntimeError::from)?))
}

pub async fn create_media(
    State(state): State<AppState>,
    Json(body): Json<CreateMediaBody>,
) -> WebResult<impl IntoResponse> {
    let media = state
        .media_files
        .create(MediaFileCreateRequest {
            path: body.path,
            filename: body.filename,
            duration_seconds: body.duration_seconds,
            file_size: body.file_size,
            show_name: body.show_name,
            season: body.season,
            episode: body.episode,
            title: body.title,
        })
        .await
        .map_err(RuntimeError::from)?;
    Ok(created(media))
}

pub async fn update_media(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateMediaBody>,
) -> WebResult<impl IntoResponse> {
    let media = state
        .media_files
        .update(&id, MediaFileUpdateRequest { title: body.title })
        .await
        .map_err(RuntimeError::from)?;
    Ok(ok(media))
}
