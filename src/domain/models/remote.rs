//! Remote tracker payloads as seen by the sync engine.
//!
//! Every list item is kept twice: a typed view with the handful of
//! fields the engine reads, and the untouched JSON that is cached for
//! display.

use chrono::{DateTime, Utc};
use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A remote object together with its verbatim JSON.
#[derive(Debug, Clone, PartialEq)]
pub struct Remote<T> {
    pub data: T,
    pub raw: Value,
}

impl<T: DeserializeOwned> Remote<T> {
    pub fn from_value(raw: Value) -> serde_json::Result<Self> {
        let data = T::deserialize(&raw)?;
        Ok(Self { data, raw })
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Remote<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Value::deserialize(deserializer)?;
        Self::from_value(raw).map_err(serde::de::Error::custom)
    }
}

/// One page of a paged list endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// The page number this response answers.
    pub page: u32,
    /// Value of the `rel="last"` link, if the response carried one.
    pub last_page: Option<u32>,
}

impl<T> Page<T> {
    /// A page without pagination metadata is the last page.
    pub fn is_last(&self) -> bool {
        self.last_page.map_or(true, |last| self.page >= last)
    }
}

/// A label as returned by the tracker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteLabel {
    pub name: String,
    #[serde(default)]
    pub color: String,
}

/// Fields of a remote issue the engine relies on.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct IssueFields {
    pub number: u64,
    #[serde(default)]
    pub title: String,
    /// API URL; the canonical identity of the issue.
    pub url: String,
    #[serde(default)]
    pub html_url: String,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub labels: Vec<RemoteLabel>,
    /// Present when the item is a pull request.
    #[serde(default)]
    pub pull_request: Option<Value>,
}

impl IssueFields {
    pub fn label_names(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(|l| l.name.as_str())
    }

    pub fn is_pull_request(&self) -> bool {
        self.pull_request.as_ref().is_some_and(|v| !v.is_null())
    }
}

/// Fields of a remote comment the engine relies on.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CommentFields {
    pub id: u64,
    #[serde(default)]
    pub body: Option<String>,
}

pub type RemoteIssue = Remote<IssueFields>;
pub type RemoteComment = Remote<CommentFields>;

/// Arguments for creating an issue.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewIssue {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub milestone: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
}

impl NewIssue {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_issue_keeps_raw_payload() {
        let json = r#"{
            "id": 1,
            "number": 42,
            "title": "Fix login bug",
            "url": "https://api.github.com/repos/org/repo/issues/42",
            "html_url": "https://github.com/org/repo/issues/42",
            "labels": [{ "name": "bug", "color": "d73a4a" }],
            "updated_at": "2024-01-15T10:30:00Z",
            "milestone": null,
            "reactions": { "+1": 3 }
        }"#;
        let issue: RemoteIssue = serde_json::from_str(json).unwrap();
        assert_eq!(issue.data.number, 42);
        assert_eq!(issue.data.label_names().collect::<Vec<_>>(), vec!["bug"]);
        assert!(!issue.data.is_pull_request());
        assert_eq!(issue.raw["reactions"]["+1"], 3);
    }

    #[test]
    fn test_pull_request_detection() {
        let issue = RemoteIssue::from_value(serde_json::json!({
            "number": 9,
            "url": "https://api.github.com/repos/org/repo/issues/9",
            "updated_at": "2024-01-15T10:30:00Z",
            "pull_request": { "url": "https://api.github.com/repos/org/repo/pulls/9" }
        }))
        .unwrap();
        assert!(issue.data.is_pull_request());
    }

    #[test]
    fn test_missing_required_field_fails() {
        let err = RemoteIssue::from_value(serde_json::json!({ "number": 1 }));
        assert!(err.is_err());
    }

    #[test]
    fn test_page_without_link_is_last() {
        let page: Page<u8> = Page { items: vec![1], page: 1, last_page: None };
        assert!(page.is_last());
        let page: Page<u8> = Page { items: vec![1], page: 1, last_page: Some(3) };
        assert!(!page.is_last());
        let page: Page<u8> = Page { items: vec![], page: 3, last_page: Some(3) };
        assert!(page.is_last());
    }

    #[test]
    fn test_new_issue_omits_unset_fields() {
        let json = serde_json::to_string(&NewIssue::new("Minimal")).unwrap();
        assert_eq!(json, r#"{"title":"Minimal"}"#);
    }
}
