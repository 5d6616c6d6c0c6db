//! Board read model and card operations.
//!
//! Reads come straight from the cache. Writes go to the remote tracker
//! with the caller's credential and are then pulled back through
//! [`SyncEngine::refresh_issue`], so the cache only ever holds what the
//! tracker reports.

use std::sync::Arc;

use futures::future::try_join_all;
use serde::Serialize;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{Comment, Credential, Issue, IssueId, NewIssue, TaskLink, TrackerTarget};
use crate::domain::ports::{IssueStore, IssueTracker};
use crate::services::sync_engine::SyncEngine;

/// Board card summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Card {
    /// Cache identifier.
    pub id: IssueId,
    /// Issue number within its repository.
    pub number: Option<u64>,
    /// Issue title.
    pub title: String,
    /// Whether the card carries the project label.
    pub is_project: bool,
}

impl From<&Issue> for Card {
    fn from(issue: &Issue) -> Self {
        Self {
            id: issue.id.clone(),
            number: issue.number(),
            title: issue.title().to_string(),
            is_project: issue.is_project,
        }
    }
}

/// One column of the board.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Column {
    /// State label filing cards into this column.
    pub state: String,
    /// Label color, six hex digits.
    pub color: String,
    /// Cards, most recently updated first.
    pub cards: Vec<Card>,
}

/// Columns in workflow order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Board {
    /// One column per configured state.
    pub columns: Vec<Column>,
}

/// An issue with its comments and outgoing task links.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CardDetail {
    /// The cached issue.
    pub issue: Issue,
    /// Its comments, oldest first.
    pub comments: Vec<Comment>,
    /// Task links it declares.
    pub links: Vec<TaskLink>,
}

/// A label created by [`BoardService::ensure_state_labels`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedLabel {
    /// Repository the label was created in.
    pub target: TrackerTarget,
    /// Label name.
    pub label: String,
}

/// Board reads and card write-backs over a shared [`SyncEngine`].
pub struct BoardService<S, T>
where
    S: IssueStore + ?Sized,
    T: IssueTracker + ?Sized,
{
    engine: Arc<SyncEngine<S, T>>,
    admin_login: Option<String>,
}

impl<S, T> BoardService<S, T>
where
    S: IssueStore + ?Sized,
    T: IssueTracker + ?Sized,
{
    /// Service over `engine`; `admin_login` names the sync identity.
    pub fn new(engine: Arc<SyncEngine<S, T>>, admin_login: Option<String>) -> Self {
        Self {
            engine,
            admin_login,
        }
    }

    /// The engine behind the board.
    pub fn engine(&self) -> &Arc<SyncEngine<S, T>> {
        &self.engine
    }

    /// Whether `login` is the admin identity whose credential drives sync.
    pub fn is_admin(&self, login: &str) -> bool {
        self.admin_login
            .as_deref()
            .is_some_and(|admin| admin.eq_ignore_ascii_case(login))
    }

    /// Build the board from the cache.
    pub async fn board(&self) -> DomainResult<Board> {
        let store = self.engine.store();
        let columns = try_join_all(self.engine.settings().states.iter().map(|state| async move {
            let issues = store.issues_by_state(&state.label).await?;
            Ok::<_, DomainError>(Column {
                state: state.label.clone(),
                color: state.color.clone(),
                cards: issues.iter().map(Card::from).collect(),
            })
        }))
        .await?;

        Ok(Board { columns })
    }

    /// Full detail of one cached card.
    pub async fn card(&self, id: &IssueId) -> DomainResult<CardDetail> {
        let store = self.engine.store();
        let issue = store
            .issue_by_id(id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("issue {id}")))?;
        let (comments, links) =
            futures::try_join!(store.comments_by_issue(id), store.task_links_by_issue(id))?;

        Ok(CardDetail {
            issue,
            comments,
            links,
        })
    }

    /// Move a card to another workflow state.
    ///
    /// Strips every other configured state label from the remote issue,
    /// adds the requested one, then refreshes it. Fails if the refreshed
    /// issue does not classify into the requested state.
    pub async fn move_issue(
        &self,
        credential: &Credential,
        id: &IssueId,
        state_label: &str,
    ) -> DomainResult<Issue> {
        let states = &self.engine.settings().states;
        if !states.iter().any(|s| s.label == state_label) {
            return Err(DomainError::NotFound(format!("workflow state '{state_label}'")));
        }

        let issue = self
            .engine
            .store()
            .issue_by_id(id)
            .await?
            .ok_or_else(|| DomainError::NotFound(format!("issue {id}")))?;
        let url = issue
            .url()
            .ok_or_else(|| DomainError::Serialization(format!("cached issue {id} has no url")))?
            .to_string();

        let tracker = self.engine.tracker();
        let remote = tracker.get_issue(credential, &url).await?;
        let stale: Vec<&str> = remote
            .data
            .label_names()
            .filter(|name| *name != state_label && states.iter().any(|s| s.label == *name))
            .collect();
        for label in &stale {
            tracker.remove_label(credential, &url, label).await?;
        }
        if !remote.data.label_names().any(|name| name == state_label) {
            tracker
                .add_labels(credential, &url, &[state_label.to_string()])
                .await?;
        }

        let moved = self.engine.refresh_issue(credential, &url).await?;
        if moved.state.as_deref() != Some(state_label) {
            return Err(DomainError::Transport(format!(
                "issue {id} reports state {:?} after moving it to '{state_label}'",
                moved.state
            )));
        }

        tracing::info!(%id, from = ?issue.state, to = state_label, removed = ?stale, "Moved card");
        Ok(moved)
    }

    /// Create an issue remotely and pull it into the cache.
    pub async fn create_issue(
        &self,
        credential: &Credential,
        target: &TrackerTarget,
        new_issue: &NewIssue,
    ) -> DomainResult<Issue> {
        let created = self
            .engine
            .tracker()
            .create_issue(credential, target, new_issue)
            .await?;
        self.engine
            .refresh_issue(credential, &created.data.url)
            .await
    }

    /// Create any configured state label missing from a target repository.
    pub async fn ensure_state_labels(&self, credential: &Credential) -> DomainResult<Vec<CreatedLabel>> {
        let tracker = self.engine.tracker();
        let settings = self.engine.settings();
        let mut created = Vec::new();

        for target in &settings.targets {
            let existing = tracker.list_labels(credential, target).await?;
            for state in &settings.states {
                if existing.iter().any(|l| l.name.eq_ignore_ascii_case(&state.label)) {
                    continue;
                }
                tracker
                    .create_label(credential, target, &state.label, &state.color)
                    .await?;
                created.push(CreatedLabel {
                    target: target.clone(),
                    label: state.label.clone(),
                });
            }
        }

        Ok(created)
    }
}
