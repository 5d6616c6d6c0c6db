//! GitHub REST request bodies.
//!
//! Responses are not modelled here: the sync engine keeps the raw JSON
//! and reads a handful of fields through the domain `Remote` types.

use serde::Serialize;

use crate::domain::models::NewIssue;

/// Request body for creating a new GitHub issue.
#[derive(Debug, Clone, Serialize)]
pub struct GitHubCreateIssueRequest<'a> {
    pub title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<&'a [String]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub milestone: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignees: Option<Vec<&'a str>>,
}

impl<'a> From<&'a NewIssue> for GitHubCreateIssueRequest<'a> {
    fn from(issue: &'a NewIssue) -> Self {
        Self {
            title: &issue.title,
            body: issue.body.as_deref(),
            labels: issue.labels.as_deref(),
            milestone: issue.milestone,
            assignees: issue.assignee.as_deref().map(|a| vec![a]),
        }
    }
}

/// Request body for defining a repository label.
#[derive(Debug, Clone, Serialize)]
pub struct GitHubCreateLabelRequest<'a> {
    pub name: &'a str,
    /// Hex colour without the leading `#`.
    pub color: &'a str,
}

/// Request body for adding labels to an issue.
#[derive(Debug, Clone, Serialize)]
pub struct GitHubAddLabelsRequest<'a> {
    pub labels: &'a [String],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_issue_request_maps_assignee() {
        let mut issue = NewIssue::new("Wire up board");
        issue.labels = Some(vec!["Backlog".to_string()]);
        issue.assignee = Some("octocat".to_string());

        let body = serde_json::to_value(GitHubCreateIssueRequest::from(&issue)).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "title": "Wire up board",
                "labels": ["Backlog"],
                "assignees": ["octocat"]
            })
        );
    }
}
