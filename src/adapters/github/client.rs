//! GitHub HTTP client with rate limiting.
//!
//! Implements [`IssueTracker`] over the GitHub REST API v3. Every call
//! is authorised with the credential the caller passes in; the client
//! itself holds no token. A token-bucket rate limiter keeps the process
//! under its configured hourly request budget.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::Mutex;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{
    Credential, GitHubConfig, NewIssue, Page, RemoteComment, RemoteIssue, RemoteLabel,
    TrackerTarget,
};
use crate::domain::ports::IssueTracker;
use crate::services::paginator::paginate;

use super::models::{GitHubAddLabelsRequest, GitHubCreateIssueRequest, GitHubCreateLabelRequest};
use super::pagination;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Token-bucket rate limiter.
///
/// Allows up to `capacity` requests per `window`. When the bucket is
/// exhausted, [`acquire`](RateLimiter::acquire) sleeps until the window
/// resets and a token becomes available.
#[derive(Debug)]
pub struct RateLimiter {
    capacity: u32,
    tokens: u32,
    window: Duration,
    window_start: Instant,
}

impl RateLimiter {
    pub fn new(capacity: u32, window: Duration) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            tokens: capacity,
            window,
            window_start: Instant::now(),
        }
    }

    /// Acquire a single token, sleeping if necessary.
    pub async fn acquire(&mut self) {
        let elapsed = self.window_start.elapsed();
        if elapsed >= self.window {
            self.tokens = self.capacity;
            self.window_start = Instant::now();
        }

        if self.tokens > 0 {
            self.tokens -= 1;
        } else {
            let remaining = self.window.saturating_sub(elapsed);
            tracing::warn!(
                sleep_ms = remaining.as_millis() as u64,
                "GitHub request budget exhausted, sleeping"
            );
            tokio::time::sleep(remaining).await;
            self.tokens = self.capacity - 1;
            self.window_start = Instant::now();
        }
    }
}

/// HTTP client for the GitHub REST API v3.
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: Client,
    api_base: String,
    base_url: Url,
    per_page: u32,
    issue_state: String,
    rate_limiter: Arc<Mutex<RateLimiter>>,
}

impl GitHubClient {
    pub fn with_config(config: &GitHubConfig) -> DomainResult<Self> {
        let http = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| DomainError::Config(format!("failed to build HTTP client: {e}")))?;
        let api_base = config.api_base.trim_end_matches('/').to_string();
        let base_url = Url::parse(&api_base)
            .map_err(|e| DomainError::Config(format!("invalid GitHub api_base '{api_base}': {e}")))?;

        Ok(Self {
            http,
            api_base,
            base_url,
            per_page: config.per_page,
            issue_state: config.issue_state.clone(),
            rate_limiter: Arc::new(Mutex::new(RateLimiter::new(
                config.requests_per_hour,
                Duration::from_secs(3_600),
            ))),
        })
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Parse a URL the client will send the credential to. Only URLs on
    /// the configured API origin (scheme, host and port) are accepted.
    fn parse_url(&self, url: &str) -> DomainResult<Url> {
        let parsed =
            Url::parse(url).map_err(|e| DomainError::MalformedReference(format!("{url}: {e}")))?;
        if parsed.origin() != self.base_url.origin() {
            return Err(DomainError::MalformedReference(format!(
                "{url} is outside the API at {}",
                self.api_base
            )));
        }
        Ok(parsed)
    }

    fn repo_url(&self, target: &TrackerTarget, suffix: &str) -> DomainResult<Url> {
        self.parse_url(&format!(
            "{}/repos/{}/{}/{}",
            self.api_base, target.owner, target.repo, suffix
        ))
    }

    /// `{issue_url}/{segments...}` with each segment percent-encoded.
    fn issue_sub_url(&self, issue_url: &str, segments: &[&str]) -> DomainResult<Url> {
        let mut url = self.parse_url(issue_url.trim_end_matches('/'))?;
        url.path_segments_mut()
            .map_err(|()| DomainError::MalformedReference(issue_url.to_string()))?
            .extend(segments);
        Ok(url)
    }

    /// Acquire a rate-limit token and build an authorised request.
    async fn rate_limited_request(
        &self,
        credential: &Credential,
        method: Method,
        url: Url,
    ) -> RequestBuilder {
        self.rate_limiter.lock().await.acquire().await;
        self.http
            .request(method, url)
            .bearer_auth(credential.expose())
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", "2022-11-28")
    }

    async fn send(&self, op: &str, request: RequestBuilder) -> DomainResult<Response> {
        let resp = request
            .send()
            .await
            .map_err(|e| DomainError::Transport(format!("GitHub {op} request failed: {e}")))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let budget_exhausted = resp
            .headers()
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == "0");
        let body = resp.text().await.unwrap_or_default();
        Err(map_status(op, status, budget_exhausted, &body))
    }

    async fn read_json<T: DeserializeOwned>(op: &str, resp: Response) -> DomainResult<T> {
        let value: Value = resp
            .json()
            .await
            .map_err(|e| DomainError::Transport(format!("GitHub {op} body read failed: {e}")))?;
        serde_json::from_value(value)
            .map_err(|e| DomainError::Serialization(format!("GitHub {op} parse failed: {e}")))
    }

    async fn get_page<T: DeserializeOwned>(
        &self,
        op: &str,
        credential: &Credential,
        url: Url,
        query: &[(&str, String)],
        page: u32,
    ) -> DomainResult<Page<T>> {
        let req = self
            .rate_limited_request(credential, Method::GET, url)
            .await
            .query(query)
            .query(&[("per_page", self.per_page), ("page", page)]);
        let resp = self.send(op, req).await?;
        let last_page = pagination::last_page(resp.headers());
        let items = Self::read_json(op, resp).await?;

        tracing::debug!(op, page, ?last_page, "Fetched GitHub page");
        Ok(Page {
            items,
            page,
            last_page,
        })
    }
}

/// Classify a non-success response.
fn map_status(op: &str, status: StatusCode, budget_exhausted: bool, body: &str) -> DomainError {
    let message = format!("GitHub {op} returned {status}: {body}");
    match status {
        StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS if budget_exhausted => {
            DomainError::Transport(message)
        }
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => DomainError::Auth(message),
        StatusCode::NOT_FOUND => DomainError::NotFound(message),
        _ => DomainError::Transport(message),
    }
}

fn since_param(since: Option<DateTime<Utc>>) -> Option<(&'static str, String)> {
    since.map(|ts| ("since", ts.to_rfc3339_opts(SecondsFormat::Secs, true)))
}

#[async_trait]
impl IssueTracker for GitHubClient {
    async fn list_issues(
        &self,
        credential: &Credential,
        target: &TrackerTarget,
        since: Option<DateTime<Utc>>,
        page: u32,
    ) -> DomainResult<Page<RemoteIssue>> {
        let url = self.repo_url(target, "issues")?;
        let mut query = vec![
            ("state", self.issue_state.clone()),
            ("sort", "updated".to_string()),
            ("direction", "asc".to_string()),
        ];
        query.extend(since_param(since));
        self.get_page("list_issues", credential, url, &query, page).await
    }

    async fn get_issue(&self, credential: &Credential, issue_url: &str) -> DomainResult<RemoteIssue> {
        let url = self.parse_url(issue_url)?;
        let req = self.rate_limited_request(credential, Method::GET, url).await;
        let resp = self.send("get_issue", req).await?;
        Self::read_json("get_issue", resp).await
    }

    async fn list_comments(
        &self,
        credential: &Credential,
        issue_url: &str,
        since: Option<DateTime<Utc>>,
        page: u32,
    ) -> DomainResult<Page<RemoteComment>> {
        let url = self.issue_sub_url(issue_url, &["comments"])?;
        let query: Vec<_> = since_param(since).into_iter().collect();
        self.get_page("list_comments", credential, url, &query, page).await
    }

    async fn create_issue(
        &self,
        credential: &Credential,
        target: &TrackerTarget,
        issue: &NewIssue,
    ) -> DomainResult<RemoteIssue> {
        let url = self.repo_url(target, "issues")?;
        let req = self
            .rate_limited_request(credential, Method::POST, url)
            .await
            .json(&GitHubCreateIssueRequest::from(issue));
        let resp = self.send("create_issue", req).await?;
        let created: RemoteIssue = Self::read_json("create_issue", resp).await?;

        tracing::info!(target = %target, number = created.data.number, "Created GitHub issue");
        Ok(created)
    }

    async fn list_labels(
        &self,
        credential: &Credential,
        target: &TrackerTarget,
    ) -> DomainResult<Vec<RemoteLabel>> {
        let mut labels = Vec::new();
        paginate(
            |page| {
                let url = self.repo_url(target, "labels");
                async move {
                    self.get_page::<RemoteLabel>("list_labels", credential, url?, &[], page)
                        .await
                }
            },
            |label| {
                labels.push(label);
                async { Ok(()) }
            },
        )
        .await?;
        Ok(labels)
    }

    async fn create_label(
        &self,
        credential: &Credential,
        target: &TrackerTarget,
        name: &str,
        color: &str,
    ) -> DomainResult<()> {
        let url = self.repo_url(target, "labels")?;
        let req = self
            .rate_limited_request(credential, Method::POST, url)
            .await
            .json(&GitHubCreateLabelRequest { name, color });
        self.send("create_label", req).await?;

        tracing::info!(target = %target, label = name, "Created GitHub label");
        Ok(())
    }

    async fn add_labels(
        &self,
        credential: &Credential,
        issue_url: &str,
        labels: &[String],
    ) -> DomainResult<()> {
        let url = self.issue_sub_url(issue_url, &["labels"])?;
        let req = self
            .rate_limited_request(credential, Method::POST, url)
            .await
            .json(&GitHubAddLabelsRequest { labels });
        self.send("add_labels", req).await?;
        Ok(())
    }

    async fn remove_label(
        &self,
        credential: &Credential,
        issue_url: &str,
        label: &str,
    ) -> DomainResult<()> {
        let url = self.issue_sub_url(issue_url, &["labels", label])?;
        let req = self.rate_limited_request(credential, Method::DELETE, url).await;
        match self.send("remove_label", req).await {
            Ok(_) | Err(DomainError::NotFound(_)) => Ok(()),
            Err(e) => Err(e),
        }
    }
}
