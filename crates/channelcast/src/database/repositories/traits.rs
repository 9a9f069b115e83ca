//! Generic repository trait, implemented per-entity against SeaORM so the
//! runtime stays storage-agnostic and testable against an in-memory mock.

use async_trait::async_trait;

use crate::errors::RepositoryResult;

#[async_trait]
pub trait Repository<T, ID>: Send + Sync
where
    T: Send + Sync,
    ID: Send + Sync + 'static,
{
    type CreateRequest: Send + Sync;
    type UpdateRequest: Send + Sync;

    async fn find_by_id(&self, id: &ID) -> RepositoryResult<Option<T>>;
    async fn find_all(&self) -> RepositoryResult<Vec<T>>;
    async fn create(&self, request: Self::CreateRequest) -> RepositoryResult<T>;
    async fn update(&self, id: &ID, request: Self::UpdateRequest) -> RepositoryResult<T>;
    async fn delete(&self, id: &ID) -> RepositoryResult<()>;

    async fn exists(&self, id: &ID) -> RepositoryResult<bool> {
        Ok(self.find_by_id(id).await?.is_some())
    }
}
