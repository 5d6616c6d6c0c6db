pub mod config;
pub mod issue;
pub mod remote;

pub use config::{BoardConfig, Config, DatabaseConfig, GitHubConfig, LoggingConfig, WorkflowState};
pub use issue::{
    canonical_url, issue_api_url, Comment, Credential, Issue, IssueId, TaskLink, TrackerTarget,
};
pub use remote::{
    CommentFields, IssueFields, NewIssue, Page, Remote, RemoteComment, RemoteIssue, RemoteLabel,
};
