use std::sync::Arc;
use std::str::FromStr;

use async_trait::async_trait;
use chrono::{NaiveTime, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use crate::entities::schedule_blocks::{self, Entity as ScheduleBlocks};
use crate::errors::{RepositoryError, RepositoryResult};
use crate::models::{PlaybackMode, ScheduleBlock};

use super::traits::Repository;

pub struct ScheduleBlockCreateRequest {
    pub channel_id: Uuid,
    pub day_of_week: Vec<u8>,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub bucket_id: Uuid,
    pub playback_mode: PlaybackMode,
    pub priority: i32,
    pub enabled: bool,
}

pub struct ScheduleBlockUpdateRequest {
    pub enabled: Option<bool>,
    pub priority: Option<i32>,
}

pub struct ScheduleBlockSeaOrmRepository {
    connection: Arc<DatabaseConnection>,
}

impl ScheduleBlockSeaOrmRepository {
    pub fn new(connection: Arc<DatabaseConnection>) -> Self {
        Self { connection }
    }

    pub async fn find_for_channel(&self, channel_id: Uuid) -> RepositoryResult<Vec<ScheduleBlock>> {
        let models = ScheduleBlocks::find()
            .filter(schedule_blocks::Column::ChannelId.eq(channel_id))
            .all(self.connection.as_ref())
            .await?;
        Ok(models.into_iter().map(model_to_domain).collect())
    }
}

fn encode_days(days: &[u8]) -> String {
    days.iter().map(|d| d.to_string()).collect::<Vec<_>>().join(",")
}

fn decode_days(raw: &str) -> Vec<u8> {
    if raw.is_empty() {
        return Vec::new();
    }
    raw.split(',').filter_map(|s| s.trim().parse().ok()).collect()
}

fn model_to_domain(model: schedule_blocks::Model) -> ScheduleBlock {
    ScheduleBlock {
        id: model.id,
        channel_id: model.channel_id,
        day_of_week: decode_days(&model.day_of_week),
        start_time: NaiveTime::parse_from_str(&model.start_time, "%H:%M:%S").unwrap_or_default(),
        end_time: NaiveTime::parse_from_str(&model.end_time, "%H:%M:%S").unwrap_or_default(),
        bucket_id: model.bucket_id,
        playback_mode: PlaybackMode::from_str(&model.playback_mode).unwrap_or(PlaybackMode::Sequential),
        priority: model.priority,
        enabled: model.enabled,
        created_at: model.created_at.with_timezone(&Utc),
    }
}

#[async_trait]
impl Repository<ScheduleBlock, Uuid> for ScheduleBlockSeaOrmRepository {
    type CreateRequest = ScheduleBlockCreateRequest;
    type UpdateRequest = ScheduleBlockUpdateRequest;

    async fn find_by_id(&self, id: &Uuid) -> RepositoryResult<Option<ScheduleBlock>> {
        let model = ScheduleBlocks::find_by_id(*id).one(self.connection.as_ref()).await?;
        Ok(model.map(model_to_domain))
    }

    async fn find_all(&self) -> RepositoryResult<Vec<ScheduleBlock>> {
        let models = ScheduleBlocks::find().all(self.connection.as_ref()).await?;
        Ok(models.into_iter().map(model_to_domain).collect())
    }

    async fn create(&self, request: Self::CreateRequest) -> RepositoryResult<ScheduleBlock> {
        let active = schedule_blocks::ActiveModel {
            id: Set(Uuid::new_v4()),
            channel_id: Set(request.channel_id),
            day_of_week: Set(encode_days(&request.day_of_week)),
            start_time: Set(request.start_time.format("%H:%M:%S").to_string()),
            end_time: Set(request.end_time.format("%H:%M:%S").to_string()),
            bucket_id: Set(request.bucket_id),
            playback_mode: Set(request.playback_mode.to_string()),
            priority: Set(request.priority),
            enabled: Set(request.enabled),
            created_at: Set(Utc::now().into()),
        };
        let model = active.insert(self.connection.as_ref()).await?;
        Ok(model_to_domain(model))
    }

    async fn update(&self, id: &Uuid, request: Self::UpdateRequest) -> RepositoryResult<ScheduleBlock> {
        let model = ScheduleBlocks::find_by_id(*id)
            .one(self.connection.as_ref())
            .await?
            .ok_or_else(|| RepositoryError::NotFound {
                entity: "schedule_block".to_string(),
                id: id.to_string(),
            })?;
        let mut active: schedule_blocks::ActiveModel = model.into();
        if let Some(enabled) = request.enabled {
            active.enabled = Set(enabled);
        }
        if let Some(priority) = request.priority {
            active.priority = Set(priority);
        }
        let model = active.update(self.connection.as_ref()).await?;
        Ok(model_to_domain(model))
    }

    async fn delete(&self, id: &Uuid) -> RepositoryResult<()> {
        ScheduleBlocks::delete_by_id(*id).exec(self.connection.as_ref()).await?;
        Ok(())
    }
}
