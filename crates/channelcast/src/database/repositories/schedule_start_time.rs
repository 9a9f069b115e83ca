//! `ScheduleStartTime` is a per-channel epoch: set once, never auto-reset.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use uuid::Uuid;

use crate::entities::schedule_start_times;
use crate::errors::RepositoryResult;

pub struct ScheduleStartTimeRepository {
    connection: Arc<DatabaseConnection>,
}

impl ScheduleStartTimeRepository {
    pub fn new(connection: Arc<DatabaseConnection>) -> Self {
        Self { connection }
    }

    pub async fn get(&self, channel_id: Uuid) -> RepositoryResult<Option<DateTime<Utc>>> {
        let model = schedule_start_times::Entity::find_by_id(channel_id)
            .one(self.connection.as_ref())
            .await?;
        Ok(model.map(|m| m.started_at.with_timezone(&Utc)))
    }

    /// Idempotent: sets the start time only if absent. Returns the effective value.
    pub async fn initialize(&self, channel_id: Uuid) -> RepositoryResult<DateTime<Utc>> {
        if let Some(existing) = self.get(channel_id).await? {
            return Ok(existing);
        }
        let now = Utc::now();
        let active = schedule_start_times::ActiveModel {
            channel_id: Set(channel_id),
            started_at: Set(now.into()),
        };
        active.insert(self.connection.as_ref()).await?;
        Ok(now)
    }

    /// Unconditional overwrite, used when an operator explicitly rewinds or
    /// fast-forwards a channel's schedule anchor.
    pub async fn set(&self, channel_id: Uuid, started_at: DateTime<Utc>) -> RepositoryResult<()> {
        let existing = schedule_start_times::Entity::find_by_id(channel_id)
            .one(self.connection.as_ref())
            .await?;
        let active = match existing {
            Some(model) => {
                let mut active: schedule_start_times::ActiveModel = model.into();
                active.started_at = Set(started_at.into());
                active
            }
            None => schedule_start_times::ActiveModel {
                channel_id: Set(channel_id),
                started_at: Set(started_at.into()),
            },
        };
        active.save(self.connection.as_ref()).await?;
        Ok(())
    }
}
