//! Port for the remote issue tracker.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::errors::DomainResult;
use crate::domain::models::{
    Credential, NewIssue, Page, RemoteComment, RemoteIssue, RemoteLabel, TrackerTarget,
};

/// Authenticated access to the remote tracker.
///
/// The caller always supplies the credential: the admin credential for
/// background sync, a session credential for user-triggered writes.
/// Implementations never store or choose one.
#[async_trait]
pub trait IssueTracker: Send + Sync {
    /// One page of a repository's issues, optionally updated at or after `since`.
    async fn list_issues(
        &self,
        credential: &Credential,
        target: &TrackerTarget,
        since: Option<DateTime<Utc>>,
        page: u32,
    ) -> DomainResult<Page<RemoteIssue>>;

    /// Fetch a single issue by its API URL.
    async fn get_issue(&self, credential: &Credential, issue_url: &str)
        -> DomainResult<RemoteIssue>;

    /// One page of an issue's comments, optionally updated at or after `since`.
    async fn list_comments(
        &self,
        credential: &Credential,
        issue_url: &str,
        since: Option<DateTime<Utc>>,
        page: u32,
    ) -> DomainResult<Page<RemoteComment>>;

    /// Create an issue and return it as the tracker reports it.
    async fn create_issue(
        &self,
        credential: &Credential,
        target: &TrackerTarget,
        issue: &NewIssue,
    ) -> DomainResult<RemoteIssue>;

    /// All labels defined in a repository.
    async fn list_labels(
        &self,
        credential: &Credential,
        target: &TrackerTarget,
    ) -> DomainResult<Vec<RemoteLabel>>;

    /// Define a new label in a repository.
    async fn create_label(
        &self,
        credential: &Credential,
        target: &TrackerTarget,
        name: &str,
        color: &str,
    ) -> DomainResult<()>;

    /// Add labels to an issue.
    async fn add_labels(
        &self,
        credential: &Credential,
        issue_url: &str,
        labels: &[String],
    ) -> DomainResult<()>;

    /// Remove one label from an issue. Removing an absent label succeeds.
    async fn remove_label(
        &self,
        credential: &Credential,
        issue_url: &str,
        label: &str,
    ) -> DomainResult<()>;
}
