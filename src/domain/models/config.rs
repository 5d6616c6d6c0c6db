use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::issue::TrackerTarget;

/// Main configuration structure for TeamBoard
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Database configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// GitHub API access
    #[serde(default)]
    pub github: GitHubConfig,

    /// Repositories mirrored into the board, synced in this order
    #[serde(default)]
    pub targets: Vec<TrackerTarget>,

    /// Board layout: workflow states and the project label
    #[serde(default)]
    pub board: BoardConfig,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct DatabaseConfig {
    /// Path to `SQLite` database file
    #[serde(default = "default_database_path")]
    pub path: String,

    /// Maximum number of database connections in pool
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_database_path() -> String {
    ".teamboard/teamboard.db".to_string()
}

const fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
            max_connections: default_max_connections(),
        }
    }
}

impl DatabaseConfig {
    /// `sqlx` connection URL for the configured path.
    pub fn url(&self) -> String {
        format!("sqlite:{}", self.path)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files; stdout only when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<PathBuf>,

    /// Rotation for file logs: daily, hourly or never
    #[serde(default = "default_rotation")]
    pub rotation: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_rotation(),
        }
    }
}

/// GitHub API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct GitHubConfig {
    /// REST API base URL (overridable for GitHub Enterprise or tests)
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Admin bearer token used for background sync (can also be set via GITHUB_TOKEN)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Login of the single admin identity whose credential drives sync
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_login: Option<String>,

    /// Page size for list endpoints (1-100)
    #[serde(default = "default_per_page")]
    pub per_page: u32,

    /// Issue state filter passed to the list endpoint: open, closed or all
    #[serde(default = "default_issue_state")]
    pub issue_state: String,

    /// Mirror pull requests as cards too
    #[serde(default)]
    pub include_pull_requests: bool,

    /// Client-side request budget per hour
    #[serde(default = "default_requests_per_hour")]
    pub requests_per_hour: u32,

    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_api_base() -> String {
    "https://api.github.com".to_string()
}

const fn default_per_page() -> u32 {
    100
}

fn default_issue_state() -> String {
    "open".to_string()
}

const fn default_requests_per_hour() -> u32 {
    5_000
}

fn default_user_agent() -> String {
    "teamboard".to_string()
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            token: None,
            admin_login: None,
            per_page: default_per_page(),
            issue_state: default_issue_state(),
            include_pull_requests: false,
            requests_per_hour: default_requests_per_hour(),
            user_agent: default_user_agent(),
        }
    }
}

/// One board column: the label that files a card into it, and its color.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowState {
    /// Label name on the remote tracker
    pub label: String,

    /// Hex color without the leading `#`
    #[serde(default = "default_state_color")]
    pub color: String,
}

fn default_state_color() -> String {
    "ededed".to_string()
}

impl WorkflowState {
    pub fn new(label: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            color: color.into(),
        }
    }
}

/// Board configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct BoardConfig {
    /// Ordered workflow states; order is the left-to-right column order
    #[serde(default)]
    pub states: Vec<WorkflowState>,

    /// Label marking an issue as a project/epic
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_label: Option<String>,
}

impl BoardConfig {
    /// Look up a configured state by label name.
    pub fn state(&self, label: &str) -> Option<&WorkflowState> {
        self.states.iter().find(|s| s.label == label)
    }
}
