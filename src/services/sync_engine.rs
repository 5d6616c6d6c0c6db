//! Issue cache sync engine.
//!
//! Mirrors remote issues, their comments and the task links declared in
//! those comments into the [`IssueStore`]. A run walks every configured
//! repository's issue list from the watermark (the newest cached
//! `updated_at`), and fully drains each issue's comments before moving
//! to the next issue.
//!
//! At most one run is in flight per engine; a trigger that arrives while
//! a run is active is a no-op.
//!
//! The watermark only moves when a run completes. Issues are first stored
//! with `last_updated` held at the run's `since`, and get their remote
//! `updated_at` once every issue and comment of the run is in. A failed
//! run therefore leaves the watermark where it started.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    Comment, Config, Credential, Issue, IssueId, RemoteComment, RemoteIssue, TrackerTarget,
    WorkflowState,
};
use crate::domain::ports::{IssueStore, IssueTracker};
use crate::services::annotation_parser::links_from_comment;
use crate::services::paginator::paginate;
use crate::services::state_classifier::classify;

/// Engine run state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    /// No run in flight.
    Idle,
    /// Preparing the store and reading the watermark.
    Initializing,
    /// Walking issues and comments.
    Syncing,
}

/// What the engine needs from configuration.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    /// API base that issue identifiers are derived under.
    pub api_base: String,
    /// Repositories to mirror, in sync order.
    pub targets: Vec<TrackerTarget>,
    /// Ordered workflow state table.
    pub states: Vec<WorkflowState>,
    /// Label marking an issue as a project card.
    pub project_label: Option<String>,
    /// Mirror pull requests as cards too.
    pub include_pull_requests: bool,
}

impl SyncSettings {
    /// Settings from the loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            api_base: config.github.api_base.clone(),
            targets: config.targets.clone(),
            states: config.board.states.clone(),
            project_label: config.board.project_label.clone(),
            include_pull_requests: config.github.include_pull_requests,
        }
    }
}

/// Counts for one completed run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Lower bound of the fetch window; `None` for a full sync.
    pub since: Option<DateTime<Utc>>,
    /// Repositories walked.
    pub targets: usize,
    /// Issues upserted.
    pub issues: u64,
    /// Pull requests seen and skipped.
    pub skipped_pull_requests: u64,
    /// Comments upserted.
    pub comments: u64,
    /// Task links upserted, counting rediscovered ones.
    pub task_links: u64,
    /// Issue list pages fetched.
    pub issue_pages: u64,
    /// Wall-clock time of the run.
    pub duration_ms: u64,
}

/// Result of a sync trigger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SyncOutcome {
    /// The run finished.
    Completed(SyncReport),
    /// Another run was in flight; nothing was done.
    AlreadyRunning,
}

#[derive(Debug, Default)]
struct RunCounters {
    issues: AtomicU64,
    skipped_pull_requests: AtomicU64,
    comments: AtomicU64,
    task_links: AtomicU64,
    /// Remote `updated_at` of each ingested issue, applied when the run completes.
    settled: Mutex<Vec<(IssueId, DateTime<Utc>)>>,
}

impl RunCounters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

/// Holds the single-run claim; resets the engine to `Idle` when dropped,
/// whether the run completed or failed.
struct RunGuard<'a> {
    state: &'a Mutex<SyncState>,
}

impl<'a> RunGuard<'a> {
    fn claim(state: &'a Mutex<SyncState>) -> Option<Self> {
        let mut current = state.lock().unwrap_or_else(PoisonError::into_inner);
        if *current != SyncState::Idle {
            return None;
        }
        *current = SyncState::Initializing;
        Some(Self { state })
    }

    fn advance(&self, next: SyncState) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = next;
    }
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner) = SyncState::Idle;
    }
}

/// Sync engine over a store and a remote tracker.
pub struct SyncEngine<S, T>
where
    S: IssueStore + ?Sized,
    T: IssueTracker + ?Sized,
{
    store: Arc<S>,
    tracker: Arc<T>,
    settings: SyncSettings,
    state: Mutex<SyncState>,
    admin_credential: RwLock<Option<Credential>>,
}

impl<S, T> SyncEngine<S, T>
where
    S: IssueStore + ?Sized,
    T: IssueTracker + ?Sized,
{
    /// Idle engine without an admin credential.
    pub fn new(store: Arc<S>, tracker: Arc<T>, settings: SyncSettings) -> Self {
        Self {
            store,
            tracker,
            settings,
            state: Mutex::new(SyncState::Idle),
            admin_credential: RwLock::new(None),
        }
    }

    /// Set the admin credential at construction time.
    pub fn with_admin_credential(self, credential: Credential) -> Self {
        self.set_admin_credential(credential);
        self
    }

    /// Install (or replace) the credential used for background sync.
    pub fn set_admin_credential(&self, credential: Credential) {
        *self
            .admin_credential
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(credential);
    }

    /// Whether background sync can run.
    pub fn has_admin_credential(&self) -> bool {
        self.admin_credential
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Current run state.
    pub fn state(&self) -> SyncState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Settings the engine was built with.
    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    /// The cache.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// The remote tracker.
    pub fn tracker(&self) -> &Arc<T> {
        &self.tracker
    }

    /// Current watermark: the newest cached issue update.
    pub async fn watermark(&self) -> DomainResult<Option<DateTime<Utc>>> {
        self.store.latest_issue_update().await
    }

    fn admin_credential(&self) -> DomainResult<Credential> {
        self.admin_credential
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or_else(|| {
                DomainError::Auth("no admin credential available for background sync".to_string())
            })
    }

    /// Run one sync pass unless one is already in flight.
    ///
    /// Errors abort the run and leave the cache as of the last successful
    /// upsert; the engine is back to `Idle` either way, so the next
    /// trigger retries from the same watermark.
    pub async fn start_sync(&self) -> DomainResult<SyncOutcome> {
        let credential = self.admin_credential()?;
        let Some(guard) = RunGuard::claim(&self.state) else {
            tracing::debug!("Sync already in flight, ignoring trigger");
            return Ok(SyncOutcome::AlreadyRunning);
        };

        let started = Instant::now();
        tracing::info!(targets = self.settings.targets.len(), "Issue sync starting");

        match self.run(&guard, &credential).await {
            Ok(mut report) => {
                report.duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
                tracing::info!(
                    issues = report.issues,
                    comments = report.comments,
                    task_links = report.task_links,
                    duration_ms = report.duration_ms,
                    "Issue sync complete"
                );
                Ok(SyncOutcome::Completed(report))
            }
            Err(err) => {
                tracing::error!(error = %err, retryable = err.is_retryable(), "Issue sync aborted");
                Err(err)
            }
        }
    }

    async fn run(&self, guard: &RunGuard<'_>, credential: &Credential) -> DomainResult<SyncReport> {
        self.store.prepare().await?;
        let since = self.store.latest_issue_update().await?;
        tracing::info!(since = ?since, "Sync window starts at watermark");

        guard.advance(SyncState::Syncing);

        let counters = RunCounters::default();
        let mut issue_pages = 0;
        for target in &self.settings.targets {
            tracing::info!(owner = %target.owner, repo = %target.repo, "Syncing repository");
            let summary = paginate(
                |page| self.tracker.list_issues(credential, target, since, page),
                |issue| self.ingest_issue(credential, target, issue, since, &counters),
            )
            .await?;
            issue_pages += u64::from(summary.pages);
        }

        let RunCounters {
            issues,
            skipped_pull_requests,
            comments,
            task_links,
            settled,
        } = counters;
        let settled = settled.into_inner().unwrap_or_else(PoisonError::into_inner);
        for (id, updated_at) in &settled {
            self.store.set_issue_updated(id, *updated_at).await?;
        }
        tracing::debug!(issues = settled.len(), "Watermark advanced");

        Ok(SyncReport {
            since,
            targets: self.settings.targets.len(),
            issues: issues.into_inner(),
            skipped_pull_requests: skipped_pull_requests.into_inner(),
            comments: comments.into_inner(),
            task_links: task_links.into_inner(),
            issue_pages,
            duration_ms: 0,
        })
    }

    /// Re-fetch one issue by API URL and re-sync all of its comments.
    ///
    /// Bypasses the watermark and does not touch the run state. The stored
    /// `last_updated` is held at the current watermark, so a write-back
    /// never hides remote changes the next sync has yet to fetch.
    pub async fn refresh_issue(&self, credential: &Credential, issue_url: &str) -> DomainResult<Issue> {
        let target = TrackerTarget::from_issue_url(issue_url)
            .ok_or_else(|| DomainError::MalformedReference(issue_url.to_string()))?;

        tracing::info!(url = issue_url, "Refreshing issue");
        let remote = self.tracker.get_issue(credential, issue_url).await?;
        let watermark = self.store.latest_issue_update().await?;
        let issue = self.store_issue(remote, watermark).await?;

        let counters = RunCounters::default();
        self.sync_comments(credential, &target, &issue, None, &counters).await?;
        tracing::debug!(
            id = %issue.id,
            comments = counters.comments.load(Ordering::Relaxed),
            "Issue refreshed"
        );
        Ok(issue)
    }

    async fn ingest_issue(
        &self,
        credential: &Credential,
        target: &TrackerTarget,
        remote: RemoteIssue,
        since: Option<DateTime<Utc>>,
        counters: &RunCounters,
    ) -> DomainResult<()> {
        if remote.data.is_pull_request() && !self.settings.include_pull_requests {
            tracing::debug!(number = remote.data.number, "Skipping pull request");
            RunCounters::bump(&counters.skipped_pull_requests);
            return Ok(());
        }

        tracing::debug!(number = remote.data.number, "Processing issue");
        let updated_at = remote.data.updated_at;
        let issue = self.store_issue(remote, since).await?;
        RunCounters::bump(&counters.issues);

        self.sync_comments(credential, target, &issue, since, counters).await?;
        counters
            .settled
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((issue.id, updated_at));
        Ok(())
    }

    /// Classify and upsert an issue with `last_updated` capped at `ceiling`,
    /// or at the epoch when there is none.
    async fn store_issue(&self, remote: RemoteIssue, ceiling: Option<DateTime<Utc>>) -> DomainResult<Issue> {
        let classification = classify(
            remote.data.label_names(),
            &self.settings.states,
            self.settings.project_label.as_deref(),
        );

        let issue = Issue {
            id: IssueId::from_url(&remote.data.url),
            last_updated: remote.data.updated_at.min(ceiling.unwrap_or(DateTime::<Utc>::UNIX_EPOCH)),
            is_project: classification.is_project,
            state: classification.state,
            raw: remote.raw,
        };
        self.store.upsert_issue(&issue).await?;
        Ok(issue)
    }

    async fn sync_comments(
        &self,
        credential: &Credential,
        target: &TrackerTarget,
        issue: &Issue,
        since: Option<DateTime<Utc>>,
        counters: &RunCounters,
    ) -> DomainResult<()> {
        let Some(url) = issue.url() else {
            return Err(DomainError::Serialization(format!(
                "cached issue {} has no API url",
                issue.id
            )));
        };

        paginate(
            |page| self.tracker.list_comments(credential, url, since, page),
            |comment| self.ingest_comment(target, &issue.id, comment, counters),
        )
        .await?;
        Ok(())
    }

    /// Upsert the task links a comment declares, then the comment itself.
    async fn ingest_comment(
        &self,
        target: &TrackerTarget,
        issue_id: &IssueId,
        remote: RemoteComment,
        counters: &RunCounters,
    ) -> DomainResult<()> {
        let body = remote.data.body.as_deref().unwrap_or_default();
        for link in links_from_comment(issue_id, body, target, &self.settings.api_base) {
            tracing::debug!(project = %link.project, task = %link.task, required = link.required, "Task link");
            self.store.upsert_task_link(&link).await?;
            RunCounters::bump(&counters.task_links);
        }

        let comment = Comment {
            issue_id: issue_id.clone(),
            comment_id: remote.data.id,
            raw: remote.raw,
        };
        self.store.upsert_comment(&comment).await?;
        RunCounters::bump(&counters.comments);
        Ok(())
    }
}
