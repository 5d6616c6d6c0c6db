//! SQLite persistence for the local issue cache.

pub mod connection;
pub mod issue_store;
pub mod migrations;

pub use connection::{create_pool, create_test_pool, ConnectionError, PoolConfig};
pub use issue_store::SqliteIssueStore;
pub use migrations::{all_embedded_migrations, Migration, MigrationError, Migrator};

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::DatabaseConfig;

/// Parse an RFC3339 datetime string from a SQLite row field.
pub fn parse_datetime(s: &str) -> DomainResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map_err(|e| DomainError::Serialization(e.to_string()))
        .map(|dt| dt.with_timezone(&Utc))
}

#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),
    #[error("Migration error: {0}")]
    Migration(#[from] MigrationError),
}

impl From<DatabaseError> for DomainError {
    fn from(err: DatabaseError) -> Self {
        DomainError::Store(err.to_string())
    }
}

/// Open the configured database and bring its schema up to date.
pub async fn initialize_database(config: &DatabaseConfig) -> Result<SqlitePool, DatabaseError> {
    let pool = create_pool(&config.url(), Some(PoolConfig::from(config))).await?;
    let migrator = Migrator::new(pool.clone());
    migrator.run_embedded_migrations(all_embedded_migrations()).await?;
    Ok(pool)
}

/// Create an in-memory test pool with all migrations applied.
pub async fn create_migrated_test_pool() -> Result<SqlitePool, DatabaseError> {
    let pool = create_test_pool().await?;
    let migrator = Migrator::new(pool.clone());
    migrator.run_embedded_migrations(all_embedded_migrations()).await?;
    Ok(pool)
}
