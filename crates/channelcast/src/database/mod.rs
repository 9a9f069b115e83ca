//! Database connection management: detects the backend from the connection
//! URL, applies a few conservative connection-pool settings, and exposes
//! `migrate()` to bring the schema up to date.

pub mod migrations;
pub mod repositories;

use std::time::Duration;

use sea_orm::{ConnectOptions, Database as SeaOrmDatabase, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::errors::{AppResult, RuntimeError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseBackend {
    Sqlite,
    Postgres,
}

#[derive(Clone)]
pub struct Database {
    connection: std::sync::Arc<DatabaseConnection>,
    backend: DatabaseBackend,
}

impl Database {
    pub async fn new(config: &DatabaseConfig) -> AppResult<Self> {
        let backend = Self::detect_backend(&config.url)?;
        let url = Self::ensure_sqlite_auto_creation(&config.url, backend)?;

        let mut options = ConnectOptions::new(url);
        options
            .max_connections(config.max_connections)
            .connect_timeout(Duration::from_secs(5))
            .acquire_timeout(Duration::from_secs(3))
            .idle_timeout(Duration::from_secs(600))
            .max_lifetime(Duration::from_secs(1800))
            .sqlx_logging(false);

        let connection = SeaOrmDatabase::connect(options).await.map_err(|e| {
            tracing::error!(error = %e, "failed to connect to database");
            RuntimeError::fatal(format!("database connection failed: {e}"))
        })?;

        info!(?backend, "database connection established");

        Ok(Self {
            connection: std::sync::Arc::new(connection),
            backend,
        })
    }

    fn detect_backend(url: &str) -> AppResult<DatabaseBackend> {
        if url.starts_with("sqlite:") {
            Ok(DatabaseBackend::Sqlite)
        } else if url.starts_with("postgres:") || url.starts_with("postgresql:") {
            Ok(DatabaseBackend::Postgres)
        } else {
            Err(RuntimeError::fatal(format!(
                "unsupported database url scheme: {url}"
            )))
        }
    }

    /// For a new SQLite file, append `?mode=rwc` and create the parent directory
    /// so the first run doesn't fail on a missing file/dir.
    fn ensure_sqlite_auto_creation(url: &str, backend: DatabaseBackend) -> AppResult<String> {
        if backend != DatabaseBackend::Sqlite {
            return Ok(url.to_string());
        }
        let path_part = url.trim_start_matches("sqlite://").split('?').next().unwrap_or("");
        if let Some(parent) = std::path::Path::new(path_part).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| RuntimeError::io_failure(format!("creating database directory: {e}")))?;
            }
        }
        if url.contains('?') {
            Ok(url.to_string())
        } else {
            Ok(format!("{url}?mode=rwc"))
        }
    }

    pub async fn migrate(&self) -> AppResult<()> {
        migrations::Migrator::up(&*self.connection, None)
            .await
            .map_err(|e| RuntimeError::fatal(format!("migration failed: {e}")))?;
        info!("database migrations applied");
        Ok(())
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.connection
    }

    pub fn backend(&self) -> DatabaseBackend {
        self.backend
    }

    pub async fn health_check(&self) -> bool {
        use sea_orm::ConnectionTrait;
        self.connection.execute_unprepared("SELECT 1").await.is_ok()
    }
}
