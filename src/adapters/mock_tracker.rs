//! Mock issue tracker for testing.
//!
//! Holds repositories in memory and answers the [`IssueTracker`] port
//! the way GitHub does: 1-based pages, a `last` page only when there is
//! more than one page, and an inclusive `since` filter on `updated_at`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use tokio::sync::{Notify, RwLock};

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    canonical_url, issue_api_url, Credential, NewIssue, Page, Remote, RemoteComment, RemoteIssue,
    RemoteLabel, TrackerTarget,
};
use crate::domain::ports::IssueTracker;

/// Build a GitHub-shaped issue payload.
pub fn issue_json(
    api_base: &str,
    target: &TrackerTarget,
    number: u64,
    title: &str,
    labels: &[&str],
    updated_at: &str,
) -> Value {
    json!({
        "id": number * 1000,
        "number": number,
        "title": title,
        "state": "open",
        "url": issue_api_url(api_base, &target.owner, &target.repo, number),
        "html_url": format!("https://github.com/{}/{}/issues/{}", target.owner, target.repo, number),
        "labels": labels.iter().map(|l| json!({ "name": l, "color": "ededed" })).collect::<Vec<_>>(),
        "updated_at": updated_at,
        "created_at": updated_at,
    })
}

/// Build a GitHub-shaped comment payload.
pub fn comment_json(id: u64, body: &str, updated_at: &str) -> Value {
    json!({
        "id": id,
        "body": body,
        "user": { "login": "octocat" },
        "created_at": updated_at,
        "updated_at": updated_at,
    })
}

/// A recorded call against the mock. Variants mirror the
/// [`IssueTracker`] methods and carry their identifying arguments.
#[allow(missing_docs)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerCall {
    ListIssues {
        target: TrackerTarget,
        since: Option<DateTime<Utc>>,
        page: u32,
    },
    GetIssue {
        url: String,
    },
    ListComments {
        url: String,
        since: Option<DateTime<Utc>>,
        page: u32,
    },
    CreateIssue {
        target: TrackerTarget,
        title: String,
    },
    ListLabels {
        target: TrackerTarget,
    },
    CreateLabel {
        target: TrackerTarget,
        name: String,
    },
    AddLabels {
        url: String,
        labels: Vec<String>,
    },
    RemoveLabel {
        url: String,
        label: String,
    },
}

#[derive(Debug, Default)]
struct MockState {
    issues: HashMap<TrackerTarget, Vec<Value>>,
    /// Keyed by canonical issue URL.
    comments: HashMap<String, Vec<Value>>,
    labels: HashMap<TrackerTarget, Vec<RemoteLabel>>,
    calls: Vec<TrackerCall>,
    fail_issue_page: Option<u32>,
    /// Canonical URL of the issue whose comment listing fails.
    fail_comments: Option<String>,
    hold: Option<Arc<Notify>>,
}

/// In-memory [`IssueTracker`].
pub struct MockTracker {
    api_base: String,
    per_page: usize,
    state: RwLock<MockState>,
}

impl MockTracker {
    /// Empty tracker whose issue URLs live under `api_base`.
    pub fn new(api_base: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into(),
            per_page: 100,
            state: RwLock::new(MockState::default()),
        }
    }

    /// Page size used for every list call.
    pub fn with_per_page(mut self, per_page: usize) -> Self {
        self.per_page = per_page.max(1);
        self
    }

    /// Add an issue payload to a repository.
    pub async fn add_issue(&self, target: &TrackerTarget, issue: Value) {
        self.state
            .write()
            .await
            .issues
            .entry(target.clone())
            .or_default()
            .push(issue);
    }

    /// Add a comment; the owning issue's `updated_at` moves forward to the
    /// comment's if that is newer.
    pub async fn add_comment(&self, target: &TrackerTarget, number: u64, comment: Value) {
        let url = canonical_url(&issue_api_url(&self.api_base, &target.owner, &target.repo, number));
        let mut state = self.state.write().await;
        if let Some(updated) = comment.get("updated_at").cloned() {
            touch_issue(&mut state, target, number, &updated);
        }
        state.comments.entry(url).or_default().push(comment);
    }

    /// Replace a comment's body and bump its `updated_at`, and the issue's.
    pub async fn edit_comment(
        &self,
        target: &TrackerTarget,
        number: u64,
        comment_id: u64,
        body: &str,
        updated_at: &str,
    ) {
        let url = canonical_url(&issue_api_url(&self.api_base, &target.owner, &target.repo, number));
        let mut state = self.state.write().await;
        if let Some(comment) = state
            .comments
            .get_mut(&url)
            .and_then(|cs| cs.iter_mut().find(|c| c["id"] == comment_id))
        {
            comment["body"] = json!(body);
            comment["updated_at"] = json!(updated_at);
        }
        touch_issue(&mut state, target, number, &json!(updated_at));
    }

    /// Define a repository label.
    pub async fn add_label(&self, target: &TrackerTarget, name: &str, color: &str) {
        self.state
            .write()
            .await
            .labels
            .entry(target.clone())
            .or_default()
            .push(RemoteLabel {
                name: name.to_string(),
                color: color.to_string(),
            });
    }

    /// Label names currently on an issue.
    pub async fn issue_labels(&self, target: &TrackerTarget, number: u64) -> Vec<String> {
        let state = self.state.read().await;
        state
            .issues
            .get(target)
            .and_then(|issues| issues.iter().find(|i| i["number"] == number))
            .and_then(|i| i["labels"].as_array())
            .map(|labels| {
                labels
                    .iter()
                    .filter_map(|l| l["name"].as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Make the given issue-list page fail with a transport error.
    pub async fn fail_issue_page(&self, page: u32) {
        self.state.write().await.fail_issue_page = Some(page);
    }

    /// Make every comment listing of the given issue fail with a transport error.
    pub async fn fail_comments_of(&self, target: &TrackerTarget, number: u64) {
        let url = canonical_url(&issue_api_url(&self.api_base, &target.owner, &target.repo, number));
        self.state.write().await.fail_comments = Some(url);
    }

    /// Drop every injected failure.
    pub async fn clear_failures(&self) {
        let mut state = self.state.write().await;
        state.fail_issue_page = None;
        state.fail_comments = None;
    }

    /// Block the next issue-list request until the returned handle is notified.
    pub async fn hold_next_issue_page(&self) -> Arc<Notify> {
        let notify = Arc::new(Notify::new());
        self.state.write().await.hold = Some(Arc::clone(&notify));
        notify
    }

    /// Every call made so far, oldest first.
    pub async fn calls(&self) -> Vec<TrackerCall> {
        self.state.read().await.calls.clone()
    }

    /// Forget the recorded calls.
    pub async fn clear_calls(&self) {
        self.state.write().await.calls.clear();
    }

    async fn record(&self, call: TrackerCall) {
        self.state.write().await.calls.push(call);
    }

    fn page_of<T: serde::de::DeserializeOwned>(
        &self,
        items: Vec<Value>,
        page: u32,
    ) -> DomainResult<Page<Remote<T>>> {
        let pages = items.len().div_ceil(self.per_page);
        let start = (page.saturating_sub(1) as usize) * self.per_page;
        let items = items
            .into_iter()
            .skip(start)
            .take(self.per_page)
            .map(Remote::from_value)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Page {
            items,
            page,
            last_page: (pages > 1).then(|| u32::try_from(pages).unwrap_or(u32::MAX)),
        })
    }

    fn find_issue<'a>(state: &'a mut MockState, url: &str) -> Option<&'a mut Value> {
        let wanted = canonical_url(url);
        state
            .issues
            .values_mut()
            .flat_map(|issues| issues.iter_mut())
            .find(|i| i["url"].as_str().map(canonical_url).as_deref() == Some(wanted.as_str()))
    }
}

fn updated_since(item: &Value, since: Option<DateTime<Utc>>) -> bool {
    let Some(since) = since else { return true };
    item["updated_at"]
        .as_str()
        .and_then(|s| s.parse::<DateTime<Utc>>().ok())
        .is_some_and(|updated| updated >= since)
}

fn touch_issue(state: &mut MockState, target: &TrackerTarget, number: u64, updated: &Value) {
    let Some(issue) = state
        .issues
        .get_mut(target)
        .and_then(|issues| issues.iter_mut().find(|i| i["number"] == number))
    else {
        return;
    };
    let newer = match (issue["updated_at"].as_str(), updated.as_str()) {
        (Some(current), Some(candidate)) => candidate > current,
        _ => false,
    };
    if newer {
        issue["updated_at"] = updated.clone();
    }
}

fn now_string() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

#[async_trait]
impl IssueTracker for MockTracker {
    async fn list_issues(
        &self,
        _credential: &Credential,
        target: &TrackerTarget,
        since: Option<DateTime<Utc>>,
        page: u32,
    ) -> DomainResult<Page<RemoteIssue>> {
        self.record(TrackerCall::ListIssues {
            target: target.clone(),
            since,
            page,
        })
        .await;

        let hold = self.state.write().await.hold.take();
        if let Some(hold) = hold {
            hold.notified().await;
        }

        let state = self.state.read().await;
        if state.fail_issue_page == Some(page) {
            return Err(DomainError::Transport(format!(
                "simulated failure listing issues page {page}"
            )));
        }
        let items = state
            .issues
            .get(target)
            .map(|issues| {
                issues
                    .iter()
                    .filter(|i| updated_since(i, since))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        drop(state);
        self.page_of(items, page)
    }

    async fn get_issue(&self, _credential: &Credential, issue_url: &str) -> DomainResult<RemoteIssue> {
        self.record(TrackerCall::GetIssue {
            url: issue_url.to_string(),
        })
        .await;

        let mut state = self.state.write().await;
        let issue = Self::find_issue(&mut state, issue_url)
            .ok_or_else(|| DomainError::NotFound(format!("GitHub get_issue returned 404 for {issue_url}")))?;
        Ok(Remote::from_value(issue.clone())?)
    }

    async fn list_comments(
        &self,
        _credential: &Credential,
        issue_url: &str,
        since: Option<DateTime<Utc>>,
        page: u32,
    ) -> DomainResult<Page<RemoteComment>> {
        self.record(TrackerCall::ListComments {
            url: issue_url.to_string(),
            since,
            page,
        })
        .await;

        let url = canonical_url(issue_url);
        let state = self.state.read().await;
        if state.fail_comments.as_deref() == Some(url.as_str()) {
            return Err(DomainError::Transport(format!(
                "simulated failure listing comments of {issue_url}"
            )));
        }
        let items = state
            .comments
            .get(&url)
            .map(|comments| {
                comments
                    .iter()
                    .filter(|c| updated_since(c, since))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        drop(state);
        self.page_of(items, page)
    }

    async fn create_issue(
        &self,
        _credential: &Credential,
        target: &TrackerTarget,
        issue: &NewIssue,
    ) -> DomainResult<RemoteIssue> {
        self.record(TrackerCall::CreateIssue {
            target: target.clone(),
            title: issue.title.clone(),
        })
        .await;

        let mut state = self.state.write().await;
        let issues = state.issues.entry(target.clone()).or_default();
        let number = issues
            .iter()
            .filter_map(|i| i["number"].as_u64())
            .max()
            .unwrap_or(0)
            + 1;
        let labels: Vec<&str> = issue
            .labels
            .iter()
            .flatten()
            .map(String::as_str)
            .collect();
        let mut created = issue_json(&self.api_base, target, number, &issue.title, &labels, &now_string());
        created["body"] = json!(issue.body);
        created["assignee"] = json!(issue.assignee.as_ref().map(|login| json!({ "login": login })));
        issues.push(created.clone());
        Ok(Remote::from_value(created)?)
    }

    async fn list_labels(
        &self,
        _credential: &Credential,
        target: &TrackerTarget,
    ) -> DomainResult<Vec<RemoteLabel>> {
        self.record(TrackerCall::ListLabels {
            target: target.clone(),
        })
        .await;
        Ok(self
            .state
            .read()
            .await
            .labels
            .get(target)
            .cloned()
            .unwrap_or_default())
    }

    async fn create_label(
        &self,
        _credential: &Credential,
        target: &TrackerTarget,
        name: &str,
        color: &str,
    ) -> DomainResult<()> {
        self.record(TrackerCall::CreateLabel {
            target: target.clone(),
            name: name.to_string(),
        })
        .await;
        self.add_label(target, name, color).await;
        Ok(())
    }

    async fn add_labels(
        &self,
        _credential: &Credential,
        issue_url: &str,
        labels: &[String],
    ) -> DomainResult<()> {
        self.record(TrackerCall::AddLabels {
            url: issue_url.to_string(),
            labels: labels.to_vec(),
        })
        .await;

        let mut state = self.state.write().await;
        let issue = Self::find_issue(&mut state, issue_url)
            .ok_or_else(|| DomainError::NotFound(format!("GitHub add_labels returned 404 for {issue_url}")))?;
        if let Some(existing) = issue["labels"].as_array_mut() {
            for label in labels {
                if !existing.iter().any(|l| l["name"] == label.as_str()) {
                    existing.push(json!({ "name": label, "color": "ededed" }));
                }
            }
        }
        issue["updated_at"] = json!(now_string());
        Ok(())
    }

    async fn remove_label(
        &self,
        _credential: &Credential,
        issue_url: &str,
        label: &str,
    ) -> DomainResult<()> {
        self.record(TrackerCall::RemoveLabel {
            url: issue_url.to_string(),
            label: label.to_string(),
        })
        .await;

        let mut state = self.state.write().await;
        if let Some(issue) = Self::find_issue(&mut state, issue_url) {
            if let Some(existing) = issue["labels"].as_array_mut() {
                existing.retain(|l| l["name"] != label);
            }
            issue["updated_at"] = json!(now_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const API: &str = "https://api.github.com";

    fn cred() -> Credential {
        Credential::new("t").unwrap()
    }

    #[tokio::test]
    async fn test_paging_matches_github_shape() {
        let tracker = MockTracker::new(API).with_per_page(2);
        let t = TrackerTarget::new("o", "r");
        for n in 1..=5 {
            tracker.add_issue(&t, issue_json(API, &t, n, "x", &[], "2024-01-01T00:00:00Z")).await;
        }

        let first = tracker.list_issues(&cred(), &t, None, 1).await.unwrap();
        assert_eq!(first.items.len(), 2);
        assert_eq!(first.last_page, Some(3));

        let last = tracker.list_issues(&cred(), &t, None, 3).await.unwrap();
        assert_eq!(last.items.len(), 1);
        assert!(last.is_last());
    }

    #[tokio::test]
    async fn test_single_page_has_no_link() {
        let tracker = MockTracker::new(API);
        let t = TrackerTarget::new("o", "r");
        tracker.add_issue(&t, issue_json(API, &t, 1, "x", &[], "2024-01-01T00:00:00Z")).await;
        let page = tracker.list_issues(&cred(), &t, None, 1).await.unwrap();
        assert_eq!(page.last_page, None);
    }

    #[tokio::test]
    async fn test_since_is_inclusive() {
        let tracker = MockTracker::new(API);
        let t = TrackerTarget::new("o", "r");
        tracker.add_issue(&t, issue_json(API, &t, 1, "old", &[], "2024-01-01T00:00:00Z")).await;
        tracker.add_issue(&t, issue_json(API, &t, 2, "new", &[], "2024-01-05T00:00:00Z")).await;
        let since = "2024-01-05T00:00:00Z".parse().ok();
        let page = tracker.list_issues(&cred(), &t, since, 1).await.unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.items[0].data.number, 2);
    }

    #[tokio::test]
    async fn test_label_mutation() {
        let tracker = MockTracker::new(API);
        let t = TrackerTarget::new("o", "r");
        tracker.add_issue(&t, issue_json(API, &t, 1, "x", &["todo"], "2024-01-01T00:00:00Z")).await;
        let url = issue_api_url(API, "o", "r", 1);

        tracker.remove_label(&cred(), &url, "todo").await.unwrap();
        tracker.add_labels(&cred(), &url, &["doing".to_string()]).await.unwrap();
        assert_eq!(tracker.issue_labels(&t, 1).await, vec!["doing".to_string()]);
    }
}
