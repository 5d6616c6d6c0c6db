//! Comment annotation parsing.
//!
//! Comments declare task dependencies with directive tokens:
//!
//! ```text
//! TB-REQUIRE(#42)            required sub-task in the same repository
//! TB-RELATE(acme/infra#7)    related task in another repository
//! ```
//!
//! Actions are case-insensitive. A token whose action is unknown or whose
//! reference does not parse is dropped; the rest of the comment is still
//! extracted.

use std::sync::LazyLock;

use regex::Regex;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{issue_api_url, IssueId, TaskLink, TrackerTarget};

static TOKEN_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\bTB-([a-z]+)\(([^()]*)\)").expect("annotation pattern is valid")
});

static REFERENCE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:([A-Za-z0-9_.-]+)/([A-Za-z0-9_.-]+))?#([0-9]+)$")
        .expect("reference pattern is valid")
});

/// Directive keyword of an annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnotationAction {
    /// The referenced issue is a required sub-task.
    Require,
    /// The referenced issue is related but optional.
    Relate,
}

impl AnnotationAction {
    fn parse(keyword: &str) -> Option<Self> {
        match keyword.to_ascii_uppercase().as_str() {
            "REQUIRE" => Some(Self::Require),
            "RELATE" => Some(Self::Relate),
            _ => None,
        }
    }
}

/// Issue named inside an annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueReference {
    /// `#number`, resolved against the repository being synced.
    Local { number: u64 },
    /// `owner/repo#number`.
    Qualified { target: TrackerTarget, number: u64 },
}

impl IssueReference {
    /// Resolve to the canonical identifier of the referenced issue.
    pub fn resolve(&self, current: &TrackerTarget, api_base: &str) -> IssueId {
        let (target, number) = match self {
            Self::Local { number } => (current, *number),
            Self::Qualified { target, number } => (target, *number),
        };
        IssueId::from_url(&issue_api_url(api_base, &target.owner, &target.repo, number))
    }
}

/// One extracted directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub action: AnnotationAction,
    pub reference: IssueReference,
}

impl Annotation {
    pub fn required(&self) -> bool {
        self.action == AnnotationAction::Require
    }
}

/// Parse the text between the parentheses of a token.
pub fn parse_reference(text: &str) -> DomainResult<IssueReference> {
    let malformed = || DomainError::MalformedReference(text.to_string());

    let caps = REFERENCE_PATTERN.captures(text.trim()).ok_or_else(malformed)?;
    let number: u64 = caps[3].parse().map_err(|_| malformed())?;
    if number == 0 {
        return Err(malformed());
    }

    match (caps.get(1), caps.get(2)) {
        (Some(owner), Some(repo)) => Ok(IssueReference::Qualified {
            target: TrackerTarget::new(owner.as_str(), repo.as_str()),
            number,
        }),
        _ => Ok(IssueReference::Local { number }),
    }
}

/// Extract every well-formed directive from a comment body, in text order.
pub fn extract_annotations(body: &str) -> Vec<Annotation> {
    TOKEN_PATTERN
        .captures_iter(body)
        .filter_map(|caps| {
            let Some(action) = AnnotationAction::parse(&caps[1]) else {
                tracing::debug!(action = &caps[1], "Skipping unknown annotation action");
                return None;
            };
            match parse_reference(&caps[2]) {
                Ok(reference) => Some(Annotation { action, reference }),
                Err(err) => {
                    tracing::debug!(token = &caps[0], error = %err, "Skipping annotation");
                    None
                }
            }
        })
        .collect()
}

/// Task links declared by a comment on issue `source`.
///
/// `current` is the repository the comment belongs to; bare `#number`
/// references resolve against it.
pub fn links_from_comment(
    source: &IssueId,
    body: &str,
    current: &TrackerTarget,
    api_base: &str,
) -> Vec<TaskLink> {
    extract_annotations(body)
        .into_iter()
        .map(|a| {
            TaskLink::new(
                source.clone(),
                a.reference.resolve(current, api_base),
                a.required(),
            )
        })
        .collect()
}
