use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use crate::entities::channels::{self, Entity as Channels};
use crate::errors::{RepositoryError, RepositoryResult};
use crate::models::{Channel, ChannelConfig, ChannelMetadata, ChannelState};

use super::traits::Repository;

pub struct ChannelCreateRequest {
    pub slug: String,
    pub name: String,
    pub output_dir: String,
    pub config: ChannelConfig,
}

pub struct ChannelUpdateRequest {
    pub name: Option<String>,
    pub config: Option<ChannelConfig>,
    pub state: Option<ChannelState>,
    pub current_index: Option<usize>,
    pub viewer_count: Option<u32>,
    pub started_at: Option<Option<chrono::DateTime<Utc>>>,
    pub last_error: Option<Option<String>>,
}

pub struct ChannelSeaOrmRepository {
    connection: Arc<DatabaseConnection>,
}

impl ChannelSeaOrmRepository {
    pub fn new(connection: Arc<DatabaseConnection>) -> Self {
        Self { connection }
    }

    pub async fn find_by_slug(&self, slug: &str) -> RepositoryResult<Option<Channel>> {
        let model = Channels::find()
            .filter(channels::Column::Slug.eq(slug))
            .one(self.connection.as_ref())
            .await?;
        Ok(model.map(model_to_domain))
    }
}

/// SeaORM surfaces a unique-index hit as an opaque `DbErr::Exec`/`DbErr::Query`
/// wrapping the backend driver's message, so there is no typed variant to
/// match on; sniff the message the way the backend spells it instead.
fn map_unique_violation(err: sea_orm::DbErr, message: &str) -> RepositoryError {
    let text = err.to_string().to_lowercase();
    if text.contains("unique") || text.contains("duplicate") {
        RepositoryError::ConstraintViolation(message.to_string())
    } else {
        RepositoryError::Database(err)
    }
}

fn model_to_domain(model: channels::Model) -> Channel {
    Channel {
        id: model.id,
        slug: model.slug,
        name: model.name,
        output_dir: model.output_dir,
        config: ChannelConfig {
            video_bitrate_kbps: model.video_bitrate_kbps as u32,
            audio_bitrate_kbps: model.audio_bitrate_kbps as u32,
            resolution: model.resolution,
            fps: model.fps as u32,
            segment_duration: model.segment_duration as u32,
            auto_start: model.auto_start,
            use_dynamic_playlist: model.use_dynamic_playlist,
            include_bumpers: model.include_bumpers,
        },
        state: model.state.parse().unwrap_or(ChannelState::Idle),
        metadata: ChannelMetadata {
            current_index: model.current_index as usize,
            viewer_count: model.viewer_count as u32,
            started_at: model.started_at.map(|d| d.with_timezone(&Utc)),
            last_error: model.last_error,
        },
    }
}

#[async_trait]
impl Repository<Channel, Uuid> for ChannelSeaOrmRepository {
    type CreateRequest = ChannelCreateRequest;
    type UpdateRequest = ChannelUpdateRequest;

    async fn find_by_id(&self, id: &Uuid) -> RepositoryResult<Option<Channel>> {
        let model = Channels::find_by_id(*id).one(self.connection.as_ref()).await?;
        Ok(model.map(model_to_domain))
    }

    async fn find_all(&self) -> RepositoryResult<Vec<Channel>> {
        let models = Channels::find().all(self.connection.as_ref()).await?;
        Ok(models.into_iter().map(model_to_domain).collect())
    }

    async fn create(&self, request: Self::CreateRequest) -> RepositoryResult<Channel> {
        let id = Uuid::new_v4();
        let slug = request.slug.clone();
        let active = channels::ActiveModel {
            id: Set(id),
            slug: Set(request.slug),
            name: Set(request.name),
            output_dir: Set(request.output_dir),
            video_bitrate_kbps: Set(request.config.video_bitrate_kbps as i32),
            audio_bitrate_kbps: Set(request.config.audio_bitrate_kbps as i32),
            resolution: Set(request.config.resolution),
            fps: Set(request.config.fps as i32),
            segment_duration: Set(request.config.segment_duration as i32),
            auto_start: Set(request.config.auto_start),
            use_dynamic_playlist: Set(request.config.use_dynamic_playlist),
            include_bumpers: Set(request.config.include_bumpers),
            state: Set(ChannelState::Idle.to_string()),
            current_index: Set(0),
            viewer_count: Set(0),
            started_at: Set(None),
            last_error: Set(None),
        };
        let model = active
            .insert(self.connection.as_ref())
            .await
            .map_err(|e| map_unique_violation(e, &format!("channel slug '{slug}' already exists")))?;
        Ok(model_to_domain(model))
    }

    async fn update(&self, id: &Uuid, request: Self::UpdateRequest) -> RepositoryResult<Channel> {
        let model = Channels::find_by_id(*id)
            .one(self.connection.as_ref())
            .await?
            .ok_or_else(|| RepositoryError::NotFound {
                entity: "channel".to_string(),
                id: id.to_string(),
            })?;

        let mut active: channels::ActiveModel = model.into();
        if let Some(name) = request.name {
            active.name = Set(name);
        }
        if let Some(config) = request.config {
            active.video_bitrate_kbps = Set(config.video_bitrate_kbps as i32);
            active.audio_bitrate_kbps = Set(config.audio_bitrate_kbps as i32);
            active.resolution = Set(config.resolution);
            active.fps = Set(config.fps as i32);
            active.segment_duration = Set(config.segment_duration as i32);
            active.auto_start = Set(config.auto_start);
            active.use_dynamic_playlist = Set(config.use_dynamic_playlist);
            active.include_bumpers = Set(config.include_bumpers);
        }
        if let Some(state) = request.state {
            active.state = Set(state.to_string());
        }
        if let Some(index) = request.current_index {
            active.current_index = Set(index as i32);
        }
        if let Some(count) = request.viewer_count {
            active.viewer_count = Set(count as i32);
        }
        if let Some(started_at) = request.started_at {
            active.started_at = Set(started_at.map(|d| d.into()));
        }
        if let Some(last_error) = request.last_error {
            active.last_error = Set(last_error);
        }

        let model = active.update(self.connection.as_ref()).await?;
        Ok(model_to_domain(model))
    }

    async fn delete(&self, id: &Uuid) -> RepositoryResult<()> {
        Channels::delete_by_id(*id).exec(self.connection.as_ref()).await?;
        Ok(())
    }
}
