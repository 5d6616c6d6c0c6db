//! SQLite implementation of the IssueStore.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::SqlitePool;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Comment, Issue, IssueId, TaskLink};
use crate::domain::ports::{IssueStore, StoreCounts};

use super::migrations::{all_embedded_migrations, Migrator};
use super::parse_datetime;

/// Timestamps are stored in a fixed-width UTC form so that `MAX()` over
/// the text column is also the chronological maximum.
fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[derive(Clone)]
pub struct SqliteIssueStore {
    pool: SqlitePool,
}

impl SqliteIssueStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

#[async_trait]
impl IssueStore for SqliteIssueStore {
    async fn prepare(&self) -> DomainResult<()> {
        let applied = Migrator::new(self.pool.clone())
            .run_embedded_migrations(all_embedded_migrations())
            .await
            .map_err(|e| DomainError::Store(e.to_string()))?;
        if applied > 0 {
            tracing::info!(applied, "Applied schema migrations");
        }
        Ok(())
    }

    async fn upsert_issue(&self, issue: &Issue) -> DomainResult<()> {
        let json = serde_json::to_string(&issue.raw)?;

        sqlx::query(
            r#"INSERT INTO issues (id, json, last_updated, is_project, state)
               VALUES (?, ?, ?, ?, ?)
               ON CONFLICT(id) DO UPDATE SET
                   json = excluded.json,
                   last_updated = excluded.last_updated,
                   is_project = excluded.is_project,
                   state = excluded.state"#,
        )
        .bind(issue.id.as_str())
        .bind(&json)
        .bind(format_timestamp(&issue.last_updated))
        .bind(issue.is_project)
        .bind(issue.state.as_deref())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn upsert_comment(&self, comment: &Comment) -> DomainResult<()> {
        let json = serde_json::to_string(&comment.raw)?;

        sqlx::query(
            r#"INSERT INTO comments (id, issue_id, json) VALUES (?, ?, ?)
               ON CONFLICT(issue_id, id) DO UPDATE SET json = excluded.json"#,
        )
        .bind(comment.comment_id as i64)
        .bind(comment.issue_id.as_str())
        .bind(&json)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn upsert_task_link(&self, link: &TaskLink) -> DomainResult<()> {
        sqlx::query(
            r#"INSERT INTO task_links (id, project, task, required) VALUES (?, ?, ?, ?)
               ON CONFLICT(id) DO UPDATE SET required = excluded.required"#,
        )
        .bind(&link.id)
        .bind(link.project.as_str())
        .bind(link.task.as_str())
        .bind(link.required)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn set_issue_updated(&self, id: &IssueId, last_updated: DateTime<Utc>) -> DomainResult<()> {
        sqlx::query("UPDATE issues SET last_updated = ? WHERE id = ?")
            .bind(format_timestamp(&last_updated))
            .bind(id.as_str())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn latest_issue_update(&self) -> DomainResult<Option<DateTime<Utc>>> {
        let (latest,): (Option<String>,) = sqlx::query_as("SELECT MAX(last_updated) FROM issues")
            .fetch_one(&self.pool)
            .await?;

        latest.as_deref().map(parse_datetime).transpose()
    }

    async fn issue_by_id(&self, id: &IssueId) -> DomainResult<Option<Issue>> {
        let row: Option<IssueRow> = sqlx::query_as(
            "SELECT id, json, last_updated, is_project, state FROM issues WHERE id = ?",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn issues_by_state(&self, state: &str) -> DomainResult<Vec<Issue>> {
        let rows: Vec<IssueRow> = sqlx::query_as(
            "SELECT id, json, last_updated, is_project, state FROM issues WHERE state = ? ORDER BY last_updated DESC, id",
        )
        .bind(state)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn comments_by_issue(&self, id: &IssueId) -> DomainResult<Vec<Comment>> {
        let rows: Vec<CommentRow> = sqlx::query_as(
            "SELECT id, issue_id, json FROM comments WHERE issue_id = ? ORDER BY id",
        )
        .bind(id.as_str())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn task_links_by_issue(&self, id: &IssueId) -> DomainResult<Vec<TaskLink>> {
        let rows: Vec<TaskLinkRow> = sqlx::query_as(
            "SELECT id, project, task, required FROM task_links WHERE project = ? ORDER BY task",
        )
        .bind(id.as_str())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn counts(&self) -> DomainResult<StoreCounts> {
        let (issues, comments, task_links): (i64, i64, i64) = sqlx::query_as(
            r#"SELECT
                   (SELECT COUNT(*) FROM issues),
                   (SELECT COUNT(*) FROM comments),
                   (SELECT COUNT(*) FROM task_links)"#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(StoreCounts {
            issues: issues as u64,
            comments: comments as u64,
            task_links: task_links as u64,
        })
    }
}

#[derive(sqlx::FromRow)]
struct IssueRow {
    id: String,
    json: String,
    last_updated: String,
    is_project: bool,
    state: Option<String>,
}

impl TryFrom<IssueRow> for Issue {
    type Error = DomainError;

    fn try_from(row: IssueRow) -> Result<Self, Self::Error> {
        Ok(Issue {
            id: IssueId::from_stored(row.id),
            raw: serde_json::from_str(&row.json)?,
            last_updated: parse_datetime(&row.last_updated)?,
            is_project: row.is_project,
            state: row.state,
        })
    }
}

#[derive(sqlx::FromRow)]
struct CommentRow {
    id: i64,
    issue_id: String,
    json: String,
}

impl TryFrom<CommentRow> for Comment {
    type Error = DomainError;

    fn try_from(row: CommentRow) -> Result<Self, Self::Error> {
        Ok(Comment {
            issue_id: IssueId::from_stored(row.issue_id),
            comment_id: row.id as u64,
            raw: serde_json::from_str(&row.json)?,
        })
    }
}

#[derive(sqlx::FromRow)]
struct TaskLinkRow {
    id: String,
    project: String,
    task: String,
    required: bool,
}

impl From<TaskLinkRow> for TaskLink {
    fn from(row: TaskLinkRow) -> Self {
        TaskLink {
            id: row.id,
            project: IssueId::from_stored(row.project),
            task: IssueId::from_stored(row.task),
            required: row.required,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::create_test_pool;
    use chrono::TimeZone;
    use serde_json::json;
    use std::sync::Arc;

    async fn setup_store() -> SqliteIssueStore {
        let pool = create_test_pool().await.unwrap();
        let store = SqliteIssueStore::new(pool);
        store.prepare().await.unwrap();
        store
    }

    fn issue(number: u64, state: Option<&str>, day: u32) -> Issue {
        let url = format!("https://api.github.com/repos/acme/board/issues/{number}");
        Issue {
            id: IssueId::from_url(&url),
            raw: json!({ "number": number, "title": format!("Issue {number}"), "url": url }),
            last_updated: Utc.with_ymd_and_hms(2024, 3, day, 12, 0, 0).unwrap(),
            is_project: false,
            state: state.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_prepare_from_spawned_task() {
        let store: Arc<dyn IssueStore> =
            Arc::new(SqliteIssueStore::new(create_test_pool().await.unwrap()));
        let spawned = Arc::clone(&store);
        tokio::spawn(async move { spawned.prepare().await })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(store.counts().await.unwrap().issues, 0);
    }

    #[tokio::test]
    async fn test_prepare_is_idempotent() {
        let store = setup_store().await;
        store.prepare().await.unwrap();
        assert_eq!(store.counts().await.unwrap(), StoreCounts::default());
    }

    #[tokio::test]
    async fn test_upsert_issue_replaces_row() {
        let store = setup_store().await;
        let mut first = issue(1, Some("Backlog"), 1);
        store.upsert_issue(&first).await.unwrap();

        first.state = Some("Done".to_string());
        first.raw["title"] = json!("Renamed");
        first.last_updated = Utc.with_ymd_and_hms(2024, 3, 5, 8, 30, 0).unwrap();
        store.upsert_issue(&first).await.unwrap();

        let loaded = store.issue_by_id(&first.id).await.unwrap().unwrap();
        assert_eq!(loaded, first);
        assert_eq!(store.counts().await.unwrap().issues, 1);
    }

    #[tokio::test]
    async fn test_issue_by_id_missing() {
        let store = setup_store().await;
        let id = IssueId::from_url("https://api.github.com/repos/acme/board/issues/404");
        assert!(store.issue_by_id(&id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_latest_issue_update() {
        let store = setup_store().await;
        assert!(store.latest_issue_update().await.unwrap().is_none());

        store.upsert_issue(&issue(1, None, 3)).await.unwrap();
        store.upsert_issue(&issue(2, None, 17)).await.unwrap();
        store.upsert_issue(&issue(3, None, 9)).await.unwrap();

        assert_eq!(
            store.latest_issue_update().await.unwrap(),
            Some(Utc.with_ymd_and_hms(2024, 3, 17, 12, 0, 0).unwrap())
        );
    }

    #[tokio::test]
    async fn test_set_issue_updated_moves_watermark() {
        let store = setup_store().await;
        let first = issue(1, None, 3);
        store.upsert_issue(&first).await.unwrap();
        store.upsert_issue(&issue(2, None, 5)).await.unwrap();

        let later = Utc.with_ymd_and_hms(2024, 3, 20, 0, 0, 0).unwrap();
        store.set_issue_updated(&first.id, later).await.unwrap();
        assert_eq!(store.latest_issue_update().await.unwrap(), Some(later));

        let unknown = IssueId::from_url("https://api.github.com/repos/acme/board/issues/404");
        store.set_issue_updated(&unknown, later).await.unwrap();
        assert_eq!(store.counts().await.unwrap().issues, 2);
    }

    #[tokio::test]
    async fn test_issues_by_state_filters_and_orders() {
        let store = setup_store().await;
        store.upsert_issue(&issue(1, Some("Doing"), 2)).await.unwrap();
        store.upsert_issue(&issue(2, Some("Doing"), 8)).await.unwrap();
        store.upsert_issue(&issue(3, Some("Done"), 4)).await.unwrap();
        store.upsert_issue(&issue(4, None, 5)).await.unwrap();

        let doing = store.issues_by_state("Doing").await.unwrap();
        let numbers: Vec<_> = doing.iter().filter_map(Issue::number).collect();
        assert_eq!(numbers, vec![2, 1]);
        assert!(store.issues_by_state("Review").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_comments_keyed_by_issue_and_id() {
        let store = setup_store().await;
        let a = issue(1, None, 1);
        let b = issue(2, None, 1);

        for (owner, id, body) in [(&a, 30, "later"), (&a, 10, "first"), (&b, 10, "other issue")] {
            store
                .upsert_comment(&Comment {
                    issue_id: owner.id.clone(),
                    comment_id: id,
                    raw: json!({ "id": id, "body": body }),
                })
                .await
                .unwrap();
        }
        store
            .upsert_comment(&Comment {
                issue_id: a.id.clone(),
                comment_id: 10,
                raw: json!({ "id": 10, "body": "edited" }),
            })
            .await
            .unwrap();

        let comments = store.comments_by_issue(&a.id).await.unwrap();
        let bodies: Vec<_> = comments.iter().map(Comment::body).collect();
        assert_eq!(bodies, vec!["edited", "later"]);
        assert_eq!(store.counts().await.unwrap().comments, 3);
    }

    #[tokio::test]
    async fn test_task_link_upsert_overwrites_required() {
        let store = setup_store().await;
        let project = issue(1, None, 1).id;
        let task = issue(2, None, 1).id;

        store.upsert_task_link(&TaskLink::new(project.clone(), task.clone(), true)).await.unwrap();
        store.upsert_task_link(&TaskLink::new(project.clone(), task.clone(), false)).await.unwrap();

        let links = store.task_links_by_issue(&project).await.unwrap();
        assert_eq!(links.len(), 1);
        assert!(!links[0].required);
        assert_eq!(links[0].task, task);
        assert!(store.task_links_by_issue(&task).await.unwrap().is_empty());
    }
}
