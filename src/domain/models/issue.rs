//! Cached issue tracker records and their identifiers.
//!
//! Identifiers are content-derived: an [`IssueId`] is a hash of the
//! issue's canonical API URL, and a [`TaskLink`] id is a hash of its
//! ordered endpoints. Re-observing the same remote object therefore
//! always lands on the same row.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::domain::errors::{DomainError, DomainResult};

/// Number of hex digits kept from the SHA-256 digest.
const ID_HEX_LEN: usize = 16;

/// Normalise an issue URL before hashing.
///
/// GitHub owner and repository names are case-insensitive, and a stray
/// trailing slash must not produce a second identity.
pub fn canonical_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_ascii_lowercase()
}

/// Build the API URL of an issue from its coordinates.
pub fn issue_api_url(api_base: &str, owner: &str, repo: &str, number: u64) -> String {
    format!(
        "{}/repos/{}/{}/issues/{}",
        api_base.trim_end_matches('/'),
        owner,
        repo,
        number
    )
}

fn short_hash(parts: &[&str]) -> String {
    let mut hasher = Sha256::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            hasher.update(b"\x00");
        }
        hasher.update(part.as_bytes());
    }
    let digest = hasher.finalize();
    digest
        .iter()
        .take(ID_HEX_LEN / 2)
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// Canonical issue identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IssueId(String);

impl IssueId {
    /// Derive the identifier from an issue URL. Pure and deterministic.
    pub fn from_url(url: &str) -> Self {
        Self(short_hash(&[&canonical_url(url)]))
    }

    /// Wrap an identifier read back from the store.
    pub fn from_stored(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IssueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A repository whose issues are mirrored.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackerTarget {
    pub owner: String,
    pub repo: String,
}

impl TrackerTarget {
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            repo: repo.into(),
        }
    }

    /// Recover the owning repository from an issue API URL
    /// (`.../repos/{owner}/{repo}/issues/{number}`).
    pub fn from_issue_url(url: &str) -> Option<Self> {
        let mut segments = url.trim_end_matches('/').rsplit('/');
        let _number = segments.next()?.parse::<u64>().ok()?;
        if segments.next()? != "issues" {
            return None;
        }
        let repo = segments.next()?;
        let owner = segments.next()?;
        if segments.next()? != "repos" || owner.is_empty() || repo.is_empty() {
            return None;
        }
        Some(Self::new(owner, repo))
    }

    /// Identifier of issue `number` in this repository.
    pub fn issue_id(&self, api_base: &str, number: u64) -> IssueId {
        IssueId::from_url(&issue_api_url(api_base, &self.owner, &self.repo, number))
    }
}

impl fmt::Display for TrackerTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}

impl FromStr for TrackerTarget {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().split_once('/') {
            Some((owner, repo)) if !owner.is_empty() && !repo.is_empty() && !repo.contains('/') => {
                Ok(Self::new(owner, repo))
            }
            _ => Err(DomainError::Config(format!(
                "expected 'owner/repo', got '{s}'"
            ))),
        }
    }
}

/// Bearer credential for the remote tracker.
///
/// The sync engine is handed the admin credential; user-triggered
/// writes pass the session credential. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> DomainResult<Self> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(DomainError::Auth("bearer credential is empty".to_string()));
        }
        Ok(Self(token))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// A cached issue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Issue {
    pub id: IssueId,
    /// Remote representation, stored verbatim.
    pub raw: Value,
    pub last_updated: DateTime<Utc>,
    pub is_project: bool,
    /// Workflow state label, `None` when the card is unfiled.
    pub state: Option<String>,
}

impl Issue {
    pub fn title(&self) -> &str {
        self.raw.get("title").and_then(Value::as_str).unwrap_or_default()
    }

    pub fn number(&self) -> Option<u64> {
        self.raw.get("number").and_then(Value::as_u64)
    }

    /// API URL the identifier was derived from.
    pub fn url(&self) -> Option<&str> {
        self.raw.get("url").and_then(Value::as_str)
    }

    pub fn html_url(&self) -> Option<&str> {
        self.raw.get("html_url").and_then(Value::as_str)
    }
}

/// A cached comment, keyed by `(issue_id, comment_id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub issue_id: IssueId,
    pub comment_id: u64,
    pub raw: Value,
}

impl Comment {
    pub fn body(&self) -> &str {
        self.raw.get("body").and_then(Value::as_str).unwrap_or_default()
    }
}

/// Directed dependency edge declared in a comment annotation:
/// `project` has a sub-task or requirement pointing at `task`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskLink {
    pub id: String,
    pub project: IssueId,
    pub task: IssueId,
    pub required: bool,
}

impl TaskLink {
    pub fn new(project: IssueId, task: IssueId, required: bool) -> Self {
        let id = Self::link_id(&project, &task);
        Self {
            id,
            project,
            task,
            required,
        }
    }

    /// Identifier of the edge for an ordered pair of issues.
    pub fn link_id(project: &IssueId, task: &IssueId) -> String {
        short_hash(&[project.as_str(), task.as_str()])
    }
}
