//! Migration registry. Each migration lives in its own module named after the
//! folder-based `m<timestamp>_<name>` convention.

pub mod m20260101_000001_initial_schema;

use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![Box::new(m20260101_000001_initial_schema::Migration)]
    }
}
