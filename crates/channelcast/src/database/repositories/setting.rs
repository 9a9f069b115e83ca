use std::sync::Arc;

use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set};

use crate::entities::settings;
use crate::errors::RepositoryResult;

pub struct SettingRepository {
    connection: Arc<DatabaseConnection>,
}

impl SettingRepository {
    pub fn new(connection: Arc<DatabaseConnection>) -> Self {
        Self { connection }
    }

    pub async fn get(&self, key: &str) -> RepositoryResult<Option<String>> {
        let model = settings::Entity::find_by_id(key.to_string())
            .one(self.connection.as_ref())
            .await?;
        Ok(model.map(|m| m.value))
    }

    pub async fn set(&self, key: &str, value: &str) -> RepositoryResult<()> {
        let existing = settings::Entity::find_by_id(key.to_string())
            .one(self.connection.as_ref())
            .await?;
        let active = match existing {
            Some(model) => {
                let mut active: settings::ActiveModel = model.into();
                active.value = Set(value.to_string());
                active
            }
            None => settings::ActiveModel {
                key: Set(key.to_string()),
                value: Set(value.to_string()),
            },
        };
        active.save(self.connection.as_ref()).await?;
        Ok(())
    }
}
