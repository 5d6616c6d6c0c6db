//! SQLite database migration management.

use sqlx::{SqliteConnection, SqlitePool};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Failed to execute migration {version}: {source}")]
    ExecutionError { version: i64, #[source] source: sqlx::Error },
    #[error("Failed to get schema version: {0}")]
    VersionCheckError(#[source] sqlx::Error),
}

#[derive(Debug, Clone)]
pub struct Migration {
    pub version: i64,
    pub description: String,
    pub sql: String,
}

pub struct Migrator {
    pool: SqlitePool,
}

impl Migrator {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn run_embedded_migrations(&self, migrations: Vec<Migration>) -> Result<usize, MigrationError> {
        self.ensure_migrations_table().await?;
        let current_version = self.get_current_version().await?;
        let pending: Vec<_> = migrations.into_iter().filter(|m| m.version > current_version).collect();

        for migration in &pending {
            tracing::debug!(version = migration.version, description = %migration.description, "Applying migration");
            self.apply_migration(migration).await?;
        }

        Ok(pending.len())
    }

    async fn ensure_migrations_table(&self) -> Result<(), MigrationError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL DEFAULT (datetime('now')),
                description TEXT
            )"
        )
        .execute(&self.pool)
        .await
        .map_err(|e| MigrationError::ExecutionError { version: 0, source: e })?;
        Ok(())
    }

    pub async fn get_current_version(&self) -> Result<i64, MigrationError> {
        let result: Option<(i64,)> = sqlx::query_as("SELECT COALESCE(MAX(version), 0) FROM schema_migrations")
            .fetch_optional(&self.pool)
            .await
            .map_err(MigrationError::VersionCheckError)?;
        Ok(result.map_or(0, |(v,)| v))
    }

    async fn apply_migration(&self, migration: &Migration) -> Result<(), MigrationError> {
        let wrap = |e| MigrationError::ExecutionError { version: migration.version, source: e };

        let mut tx = self.pool.begin().await.map_err(wrap)?;
        // A concrete connection keeps the executor lifetime out of the Send bound.
        let conn: &mut SqliteConnection = &mut tx;
        sqlx::Executor::execute(&mut *conn, sqlx::raw_sql(&migration.sql)).await.map_err(wrap)?;
        sqlx::query("INSERT INTO schema_migrations (version, description) VALUES (?, ?)")
            .bind(migration.version)
            .bind(&migration.description)
            .execute(&mut *conn)
            .await
            .map_err(wrap)?;
        tx.commit().await.map_err(wrap)?;
        Ok(())
    }
}

const INITIAL_SCHEMA: &str = r"
CREATE TABLE IF NOT EXISTS issues (
    id TEXT PRIMARY KEY,
    json TEXT NOT NULL,
    last_updated TEXT NOT NULL,
    is_project INTEGER NOT NULL DEFAULT 0,
    state TEXT
);
CREATE INDEX IF NOT EXISTS idx_issues_state ON issues(state);
CREATE INDEX IF NOT EXISTS idx_issues_last_updated ON issues(last_updated);

CREATE TABLE IF NOT EXISTS comments (
    id INTEGER NOT NULL,
    issue_id TEXT NOT NULL,
    json TEXT NOT NULL,
    PRIMARY KEY (issue_id, id)
);
CREATE INDEX IF NOT EXISTS idx_comments_issue ON comments(issue_id);

CREATE TABLE IF NOT EXISTS task_links (
    id TEXT PRIMARY KEY,
    project TEXT NOT NULL,
    task TEXT NOT NULL,
    required INTEGER NOT NULL DEFAULT 0
);
CREATE INDEX IF NOT EXISTS idx_task_links_project ON task_links(project);
";

pub fn initial_schema_migration() -> Migration {
    Migration {
        version: 1,
        description: "Issues, comments and task links".to_string(),
        sql: INITIAL_SCHEMA.to_string(),
    }
}

pub fn all_embedded_migrations() -> Vec<Migration> {
    vec![initial_schema_migration()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::create_test_pool;

    #[tokio::test]
    async fn test_migrations_apply_once() {
        let pool = create_test_pool().await.unwrap();
        let migrator = Migrator::new(pool.clone());

        assert_eq!(migrator.run_embedded_migrations(all_embedded_migrations()).await.unwrap(), 1);
        assert_eq!(migrator.get_current_version().await.unwrap(), 1);
        assert_eq!(migrator.run_embedded_migrations(all_embedded_migrations()).await.unwrap(), 0);

        let tables: Vec<(String,)> =
            sqlx::query_as("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
                .fetch_all(&pool)
                .await
                .unwrap();
        let names: Vec<_> = tables.into_iter().map(|(n,)| n).collect();
        for expected in ["comments", "issues", "schema_migrations", "task_links"] {
            assert!(names.iter().any(|n| n == expected), "missing table {expected}");
        }
    }

    #[tokio::test]
    async fn test_migrations_run_on_spawned_task() {
        let pool = create_test_pool().await.unwrap();
        let migrator = Migrator::new(pool);

        let applied = tokio::spawn(async move {
            migrator.run_embedded_migrations(all_embedded_migrations()).await
        })
        .await
        .unwrap()
        .unwrap();
        assert_eq!(applied, 1);
    }
}
