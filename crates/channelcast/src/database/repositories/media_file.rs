use std::sync::Arc;

use async_trait::async_trait;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};
use uuid::Uuid;

use crate::entities::media_files::{self, Entity as MediaFiles};
use crate::errors::RepositoryResult;
use crate::models::MediaFile;

use super::traits::Repository;

pub struct MediaFileCreateRequest {
    pub path: String,
    pub filename: String,
    pub duration_seconds: f64,
    pub file_size: u64,
    pub show_name: Option<String>,
    pub season: Option<u32>,
    pub episode: Option<u32>,
    pub title: Option<String>,
}

pub struct MediaFileUpdateRequest {
    pub title: Option<String>,
}

pub struct MediaFileSeaOrmRepository {
    connection: Arc<DatabaseConnection>,
}

impl MediaFileSeaOrmRepository {
    pub fn new(connection: Arc<DatabaseConnection>) -> Self {
        Self { connection }
    }

    pub async fn find_by_ids(&self, ids: &[Uuid]) -> RepositoryResult<Vec<MediaFile>> {
        use sea_orm::{ColumnTrait, QueryFilter};
        let models = MediaFiles::find()
            .filter(media_files::Column::Id.is_in(ids.iter().copied()))
            .all(self.connection.as_ref())
            .await?;
        Ok(models.into_iter().map(model_to_domain).collect())
    }
}

fn model_to_domain(model: media_files::Model) -> MediaFile {
    MediaFile {
        id: model.id,
        path: model.path,
        filename: model.filename,
        duration_seconds: model.duration_seconds,
        file_size: model.file_size as u64,
        show_name: model.show_name,
        season: model.season.map(|s| s as u32),
        episode: model.episode.map(|e| e as u32),
        title: model.title,
    }
}

#[async_trait]
impl Repository<MediaFile, Uuid> for MediaFileSeaOrmRepository {
    type CreateRequest = MediaFileCreateRequest;
    type UpdateRequest = MediaFileUpdateRequest;

    async fn find_by_id(&self, id: &Uuid) -> RepositoryResult<Option<MediaFile>> {
        let model = MediaFiles::find_by_id(*id).one(self.connection.as_ref()).await?;
        Ok(model.map(model_to_domain))
    }

    async fn find_all(&self) -> RepositoryResult<Vec<MediaFile>> {
        let models = MediaFiles::find().all(self.connection.as_ref()).await?;
        Ok(models.into_iter().map(model_to_domain).collect())
    }

    async fn create(&self, request: Self::CreateRequest) -> RepositoryResult<MediaFile> {
        let active = media_files::ActiveModel {
            id: Set(Uuid::new_v4()),
            path: Set(request.path),
            filename: Set(request.filename),
            duration_seconds: Set(request.duration_seconds),
            file_size: Set(request.file_size as i64),
            show_name: Set(request.show_name),
            season: Set(request.season.map(|s| s as i32)),
            episode: Set(request.episode.map(|e| e as i32)),
            title: Set(request.title),
        };
        let model = active.insert(self.connection.as_ref()).await?;
        Ok(model_to_domain(model))
    }

    async fn update(&self, id: &Uuid, request: Self::UpdateRequest) -> RepositoryResult<MediaFile> {
        use crate::errors::RepositoryError;
        let model = MediaFiles::find_by_id(*id)
            .one(self.connection.as_ref())
            .await?
            .ok_or_else(|| RepositoryError::NotFound {
                entity: "media_file".to_string(),
                id: id.to_string(),
            })?;
        let mut active: media_files::ActiveModel = model.into();
        if let Some(title) = request.title {
            active.title = Set(Some(title));
        }
        let model = active.update(self.connection.as_ref()).await?;
        Ok(model_to_domain(model))
    }

    async fn delete(&self, id: &Uuid) -> RepositoryResult<()> {
        MediaFiles::delete_by_id(*id).exec(self.connection.as_ref()).await?;
        Ok(())
    }
}
