//! Repository port for the local issue cache.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::errors::DomainResult;
use crate::domain::models::{Comment, Issue, IssueId, TaskLink};

/// Row counts per record kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StoreCounts {
    pub issues: u64,
    pub comments: u64,
    pub task_links: u64,
}

/// Key-indexed store of issues, comments and task links.
///
/// Every write is an upsert keyed by the record's canonical identifier
/// and is atomic per record. No transaction spans several records, so
/// readers may observe a partially synced cache mid-run.
#[async_trait]
pub trait IssueStore: Send + Sync {
    /// Create the schema if needed. Idempotent.
    async fn prepare(&self) -> DomainResult<()>;

    /// Insert or replace an issue.
    async fn upsert_issue(&self, issue: &Issue) -> DomainResult<()>;

    /// Insert or replace a comment.
    async fn upsert_comment(&self, comment: &Comment) -> DomainResult<()>;

    /// Insert a task link, or overwrite the `required` flag of an existing edge.
    async fn upsert_task_link(&self, link: &TaskLink) -> DomainResult<()>;

    /// Overwrite the `last_updated` of a cached issue. Unknown ids are ignored.
    async fn set_issue_updated(&self, id: &IssueId, last_updated: DateTime<Utc>) -> DomainResult<()>;

    /// Most recent `last_updated` across all issues; the sync watermark.
    async fn latest_issue_update(&self) -> DomainResult<Option<DateTime<Utc>>>;

    /// Get an issue by identifier.
    async fn issue_by_id(&self, id: &IssueId) -> DomainResult<Option<Issue>>;

    /// Issues filed under a workflow state label.
    async fn issues_by_state(&self, state: &str) -> DomainResult<Vec<Issue>>;

    /// Comments belonging to an issue, oldest remote id first.
    async fn comments_by_issue(&self, id: &IssueId) -> DomainResult<Vec<Comment>>;

    /// Outgoing task links of an issue.
    async fn task_links_by_issue(&self, id: &IssueId) -> DomainResult<Vec<TaskLink>>;

    /// Row counts per record kind.
    async fn counts(&self) -> DomainResult<StoreCounts>;
}
