use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

use crate::entities::{bucket_media, buckets, channel_buckets};
use crate::errors::{RepositoryError, RepositoryResult};
use crate::models::{Bucket, BucketType, ChannelBucket};

use super::traits::Repository;

pub struct BucketCreateRequest {
    pub name: String,
    pub bucket_type: BucketType,
}

pub struct BucketUpdateRequest {
    pub name: Option<String>,
}

pub struct BucketSeaOrmRepository {
    connection: Arc<DatabaseConnection>,
}

impl BucketSeaOrmRepository {
    pub fn new(connection: Arc<DatabaseConnection>) -> Self {
        Self { connection }
    }

    async fn member_ids(&self, bucket_id: Uuid) -> RepositoryResult<Vec<Uuid>> {
        let rows = bucket_media::Entity::find()
            .filter(bucket_media::Column::BucketId.eq(bucket_id))
            .order_by_asc(bucket_media::Column::Position)
            .all(self.connection.as_ref())
            .await?;
        Ok(rows.into_iter().map(|r| r.media_id).collect())
    }

    /// Appends `media_id` at the end of the bucket's ordered membership.
    pub async fn add_member(&self, bucket_id: Uuid, media_id: Uuid) -> RepositoryResult<()> {
        let next_position = self.member_ids(bucket_id).await?.len() as i32;
        let active = bucket_media::ActiveModel {
            bucket_id: Set(bucket_id),
            media_id: Set(media_id),
            position: Set(next_position),
        };
        active.insert(self.connection.as_ref()).await?;
        Ok(())
    }

    pub async fn remove_member(&self, bucket_id: Uuid, media_id: Uuid) -> RepositoryResult<()> {
        bucket_media::Entity::delete_many()
            .filter(bucket_media::Column::BucketId.eq(bucket_id))
            .filter(bucket_media::Column::MediaId.eq(media_id))
            .exec(self.connection.as_ref())
            .await?;
        Ok(())
    }

    /// Associates a channel with a bucket at the given priority (higher wins ties).
    pub async fn associate_channel(
        &self,
        channel_id: Uuid,
        bucket_id: Uuid,
        priority: i32,
    ) -> RepositoryResult<()> {
        let active = channel_buckets::ActiveModel {
            channel_id: Set(channel_id),
            bucket_id: Set(bucket_id),
            priority: Set(priority),
        };
        active.insert(self.connection.as_ref()).await?;
        Ok(())
    }

    /// Buckets associated with a channel, highest priority first.
    pub async fn find_for_channel(&self, channel_id: Uuid) -> RepositoryResult<Vec<ChannelBucket>> {
        let rows = channel_buckets::Entity::find()
            .filter(channel_buckets::Column::ChannelId.eq(channel_id))
            .order_by_desc(channel_buckets::Column::Priority)
            .all(self.connection.as_ref())
            .await?;
        Ok(rows
            .into_iter()
            .map(|r| ChannelBucket {
                channel_id: r.channel_id,
                bucket_id: r.bucket_id,
                priority: r.priority,
            })
            .collect())
    }
}

async fn model_to_domain(
    repo: &BucketSeaOrmRepository,
    model: buckets::Model,
) -> RepositoryResult<Bucket> {
    let media_ids = repo.member_ids(model.id).await?;
    Ok(Bucket {
        id: model.id,
        name: model.name,
        bucket_type: model.bucket_type.parse().unwrap_or(BucketType::Global),
        media_ids,
    })
}

#[async_trait]
impl Repository<Bucket, Uuid> for BucketSeaOrmRepository {
    type CreateRequest = BucketCreateRequest;
    type UpdateRequest = BucketUpdateRequest;

    async fn find_by_id(&self, id: &Uuid) -> RepositoryResult<Option<Bucket>> {
        let model = buckets::Entity::find_by_id(*id).one(self.connection.as_ref()).await?;
        match model {
            Some(model) => Ok(Some(model_to_domain(self, model).await?)),
            None => Ok(None),
        }
    }

    async fn find_all(&self) -> RepositoryResult<Vec<Bucket>> {
        let models = buckets::Entity::find().all(self.connection.as_ref()).await?;
        let mut out = Vec::with_capacity(models.len());
        for model in models {
            out.push(model_to_domain(self, model).await?);
        }
        Ok(out)
    }

    async fn create(&self, request: Self::CreateRequest) -> RepositoryResult<Bucket> {
        let active = buckets::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(request.name),
            bucket_type: Set(request.bucket_type.to_string()),
        };
        let model = active.insert(self.connection.as_ref()).await?;
        model_to_domain(self, model).await
    }

    async fn update(&self, id: &Uuid, request: Self::UpdateRequest) -> RepositoryResult<Bucket> {
        let model = buckets::Entity::find_by_id(*id)
            .one(self.connection.as_ref())
            .await?
            .ok_or_else(|| RepositoryError::NotFound {
                entity: "bucket".to_string(),
                id: id.to_string(),
            })?;
        let mut active: buckets::ActiveModel = model.into();
        if let Some(name) = request.name {
            active.name = Set(name);
        }
        let model = active.update(self.connection.as_ref()).await?;
        model_to_domain(self, model).await
    }

    async fn delete(&self, id: &Uuid) -> RepositoryResult<()> {
        buckets::Entity::delete_by_id(*id).exec(self.connection.as_ref()).await?;
        Ok(())
    }
}
