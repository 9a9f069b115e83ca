use std::sync::Arc;
use std::str::FromStr;

use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use chrono::Utc;
use uuid::Uuid;

use crate::entities::playback_sessions;
use crate::errors::RepositoryResult;
use crate::models::{PlaybackSession, SessionKind, SessionTrigger};

pub struct PlaybackSessionRepository {
    connection: Arc<DatabaseConnection>,
}

impl PlaybackSessionRepository {
    pub fn new(connection: Arc<DatabaseConnection>) -> Self {
        Self { connection }
    }

    pub async fn open(
        &self,
        channel_id: Uuid,
        kind: SessionKind,
        trigger: SessionTrigger,
    ) -> RepositoryResult<PlaybackSession> {
        let active = playback_sessions::ActiveModel {
            id: Set(Uuid::new_v4()),
            channel_id: Set(channel_id),
            started_at: Set(Utc::now().into()),
            ended_at: Set(None),
            kind: Set(kind.to_string()),
            trigger: Set(trigger.to_string()),
        };
        let model = active.insert(self.connection.as_ref()).await?;
        Ok(PlaybackSession {
            id: model.id,
            channel_id: model.channel_id,
            started_at: model.started_at.with_timezone(&Utc),
            ended_at: None,
            kind,
            trigger,
        })
    }

    /// Closes the most recent still-open session for a channel, if any.
    pub async fn close_open(&self, channel_id: Uuid) -> RepositoryResult<()> {
        use sea_orm::QueryOrder;
        let open_session = playback_sessions::Entity::find()
            .filter(playback_sessions::Column::ChannelId.eq(channel_id))
            .filter(playback_sessions::Column::EndedAt.is_null())
            .order_by_desc(playback_sessions::Column::StartedAt)
            .one(self.connection.as_ref())
            .await?;

        if let Some(model) = open_session {
            let mut active: playback_sessions::ActiveModel = model.into();
            active.ended_at = Set(Some(Utc::now().into()));
            active.update(self.connection.as_ref()).await?;
        }
        Ok(())
    }
}

#[allow(dead_code)]
fn parse_kind(raw: &str) -> SessionKind {
    SessionKind::from_str(raw).unwrap_or(SessionKind::Started)
}
