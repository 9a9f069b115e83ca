//! Not a generic `Repository<T,ID>` (the key is a pair, not a single id); a
//! narrow upsert/read interface suits the playlist resolver's use better.

use std::sync::Arc;

use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};
use uuid::Uuid;

use crate::entities::bucket_progression;
use crate::errors::RepositoryResult;
use crate::models::BucketProgression;

pub struct BucketProgressionRepository {
    connection: Arc<DatabaseConnection>,
}

impl BucketProgressionRepository {
    pub fn new(connection: Arc<DatabaseConnection>) -> Self {
        Self { connection }
    }

    pub async fn find(
        &self,
        channel_id: Uuid,
        bucket_id: Uuid,
    ) -> RepositoryResult<Option<BucketProgression>> {
        let model = bucket_progression::Entity::find()
            .filter(bucket_progression::Column::ChannelId.eq(channel_id))
            .filter(bucket_progression::Column::BucketId.eq(bucket_id))
            .one(self.connection.as_ref())
            .await?;
        Ok(model.map(|m| BucketProgression {
            channel_id: m.channel_id,
            bucket_id: m.bucket_id,
            last_played_media_id: m.last_played_media_id,
            position_in_bucket: m.position_in_bucket as usize,
        }))
    }

    pub async fn upsert(
        &self,
        channel_id: Uuid,
        bucket_id: Uuid,
        last_played_media_id: Option<Uuid>,
        position_in_bucket: usize,
    ) -> RepositoryResult<()> {
        let existing = bucket_progression::Entity::find()
            .filter(bucket_progression::Column::ChannelId.eq(channel_id))
            .filter(bucket_progression::Column::BucketId.eq(bucket_id))
            .one(self.connection.as_ref())
            .await?;

        let active = match existing {
            Some(model) => {
                let mut active: bucket_progression::ActiveModel = model.into();
                active.last_played_media_id = Set(last_played_media_id);
                active.position_in_bucket = Set(position_in_bucket as i32);
                active
            }
            None => bucket_progression::ActiveModel {
                channel_id: Set(channel_id),
                bucket_id: Set(bucket_id),
                last_played_media_id: Set(last_played_media_id),
                position_in_bucket: Set(position_in_bucket as i32),
            },
        };
        active.save(self.connection.as_ref()).await?;
        Ok(())
    }
}
