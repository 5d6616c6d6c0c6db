use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::errors::DomainError;
use crate::domain::models::{Config, Credential};

/// Project-local configuration directory.
pub const CONFIG_DIR: &str = ".teamboard";

/// Environment variable consulted when `github.token` is unset.
pub const TOKEN_ENV_VAR: &str = "GITHUB_TOKEN";

/// Configuration error types
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Database path cannot be empty")]
    EmptyDatabasePath,

    #[error("Invalid max_connections: {0}. Must be at least 1")]
    InvalidMaxConnections(u32),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidRotation(String),

    #[error("No repositories configured under `targets`")]
    NoTargets,

    #[error("Invalid target '{0}': owner and repo must be non-empty")]
    InvalidTarget(String),

    #[error("Workflow state label cannot be empty")]
    EmptyStateLabel,

    #[error("Duplicate workflow state label: {0}")]
    DuplicateStateLabel(String),

    #[error("Invalid color '{color}' for state '{label}'. Must be 6 hex digits")]
    InvalidColor { label: String, color: String },

    #[error("Invalid per_page: {0}. Must be between 1 and 100")]
    InvalidPerPage(u32),

    #[error("Invalid requests_per_hour: {0}. Must be at least 1")]
    InvalidRequestBudget(u32),
}

impl From<ConfigError> for DomainError {
    fn from(err: ConfigError) -> Self {
        DomainError::Config(err.to_string())
    }
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for the project in the current directory.
    pub fn load() -> Result<Config> {
        Self::load_from_dir(".")
    }

    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .teamboard/config.yaml (project config, created by init)
    /// 3. .teamboard/local.yaml (untracked local overrides, optional)
    /// 4. Environment variables (TEAMBOARD_* prefix, `__` between levels)
    pub fn load_from_dir(project_dir: impl AsRef<Path>) -> Result<Config> {
        let config_dir = project_dir.as_ref().join(CONFIG_DIR);
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(config_dir.join("config.yaml")))
            .merge(Yaml::file(config_dir.join("local.yaml")))
            .merge(Env::prefixed("TEAMBOARD_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.as_ref().display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.database.path.trim().is_empty() {
            return Err(ConfigError::EmptyDatabasePath);
        }
        if config.database.max_connections == 0 {
            return Err(ConfigError::InvalidMaxConnections(config.database.max_connections));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }
        if !["json", "pretty"].contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }
        if !["daily", "hourly", "never"].contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidRotation(config.logging.rotation.clone()));
        }

        if config.targets.is_empty() {
            return Err(ConfigError::NoTargets);
        }
        if let Some(bad) = config
            .targets
            .iter()
            .find(|t| t.owner.trim().is_empty() || t.repo.trim().is_empty())
        {
            return Err(ConfigError::InvalidTarget(bad.to_string()));
        }

        let mut seen = HashSet::new();
        for state in &config.board.states {
            if state.label.trim().is_empty() {
                return Err(ConfigError::EmptyStateLabel);
            }
            if !seen.insert(state.label.as_str()) {
                return Err(ConfigError::DuplicateStateLabel(state.label.clone()));
            }
            if !is_hex_color(&state.color) {
                return Err(ConfigError::InvalidColor {
                    label: state.label.clone(),
                    color: state.color.clone(),
                });
            }
        }

        if !(1..=100).contains(&config.github.per_page) {
            return Err(ConfigError::InvalidPerPage(config.github.per_page));
        }
        if config.github.requests_per_hour == 0 {
            return Err(ConfigError::InvalidRequestBudget(config.github.requests_per_hour));
        }

        Ok(())
    }
}

fn is_hex_color(color: &str) -> bool {
    color.len() == 6 && color.chars().all(|c| c.is_ascii_hexdigit())
}

/// The admin credential: `github.token`, else the `GITHUB_TOKEN` environment variable.
pub fn admin_credential(config: &Config) -> Option<Credential> {
    config
        .github
        .token
        .clone()
        .or_else(|| std::env::var(TOKEN_ENV_VAR).ok())
        .and_then(|token| Credential::new(token).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{TrackerTarget, WorkflowState};
    use std::fs;

    fn valid_config() -> Config {
        let mut config = Config::default();
        config.targets.push(TrackerTarget::new("acme", "board"));
        config.board.states = vec![
            WorkflowState::new("Backlog", "ededed"),
            WorkflowState::new("Doing", "FBCA04"),
        ];
        config
    }

    fn write_project(dir: &Path, config_yaml: &str, local_yaml: Option<&str>) {
        let config_dir = dir.join(CONFIG_DIR);
        fs::create_dir_all(&config_dir).unwrap();
        fs::write(config_dir.join("config.yaml"), config_yaml).unwrap();
        if let Some(local) = local_yaml {
            fs::write(config_dir.join("local.yaml"), local).unwrap();
        }
    }

    const PROJECT_YAML: &str = r#"
targets:
  - owner: acme
    repo: board
board:
  project_label: epic
  states:
    - label: Backlog
    - label: In Progress
      color: fbca04
github:
  admin_login: octo-admin
"#;

    #[test]
    fn test_default_config_needs_targets() {
        let config = Config::default();
        assert_eq!(config.database.path, ".teamboard/teamboard.db");
        assert_eq!(config.github.per_page, 100);
        assert_eq!(ConfigLoader::validate(&config), Err(ConfigError::NoTargets));
        assert!(ConfigLoader::validate(&valid_config()).is_ok());
    }

    #[test]
    fn test_load_from_dir_merges_layers() {
        let dir = tempfile::tempdir().unwrap();
        write_project(dir.path(), PROJECT_YAML, Some("logging:\n  level: debug\n"));

        temp_env::with_vars(
            [
                ("TEAMBOARD_GITHUB__PER_PAGE", Some("50")),
                ("TEAMBOARD_LOGGING__FORMAT", None::<&str>),
            ],
            || {
                let config = ConfigLoader::load_from_dir(dir.path()).unwrap();
                assert_eq!(config.targets, vec![TrackerTarget::new("acme", "board")]);
                assert_eq!(config.board.project_label.as_deref(), Some("epic"));
                assert_eq!(config.board.states[0].color, "ededed");
                assert_eq!(config.board.states[1].label, "In Progress");
                assert_eq!(config.logging.level, "debug");
                assert_eq!(config.github.per_page, 50);
                assert_eq!(config.github.admin_login.as_deref(), Some("octo-admin"));
            },
        );
    }

    #[test]
    fn test_load_from_file_rejects_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.yaml");
        fs::write(
            &path,
            "targets:\n  - owner: acme\n    repo: board\ngithub:\n  per_page: 500\n",
        )
        .unwrap();
        let err = ConfigLoader::load_from_file(&path).unwrap_err();
        assert!(err.to_string().contains("per_page"));
    }

    #[test]
    fn test_validate_state_table() {
        let mut config = valid_config();
        config.board.states.push(WorkflowState::new("Backlog", "000000"));
        assert_eq!(
            ConfigLoader::validate(&config),
            Err(ConfigError::DuplicateStateLabel("Backlog".to_string()))
        );

        let mut config = valid_config();
        config.board.states[1].color = "#fbca04".to_string();
        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidColor { .. })
        ));

        let mut config = valid_config();
        config.board.states[0].label = " ".to_string();
        assert_eq!(ConfigLoader::validate(&config), Err(ConfigError::EmptyStateLabel));
    }

    #[test]
    fn test_validate_logging_and_database() {
        let mut config = valid_config();
        config.logging.level = "verbose".to_string();
        assert!(matches!(ConfigLoader::validate(&config), Err(ConfigError::InvalidLogLevel(_))));

        let mut config = valid_config();
        config.logging.rotation = "weekly".to_string();
        assert!(matches!(ConfigLoader::validate(&config), Err(ConfigError::InvalidRotation(_))));

        let mut config = valid_config();
        config.database.max_connections = 0;
        assert_eq!(ConfigLoader::validate(&config), Err(ConfigError::InvalidMaxConnections(0)));

        let mut config = valid_config();
        config.github.requests_per_hour = 0;
        assert_eq!(ConfigLoader::validate(&config), Err(ConfigError::InvalidRequestBudget(0)));
    }

    #[test]
    fn test_validate_blank_target() {
        let mut config = valid_config();
        config.targets.push(TrackerTarget::new("acme", ""));
        assert!(matches!(ConfigLoader::validate(&config), Err(ConfigError::InvalidTarget(_))));
    }

    #[test]
    fn test_admin_credential_sources() {
        let mut config = valid_config();
        temp_env::with_var(TOKEN_ENV_VAR, Some("from-env"), || {
            assert_eq!(admin_credential(&config).unwrap().expose(), "from-env");
            config.github.token = Some("from-config".to_string());
            assert_eq!(admin_credential(&config).unwrap().expose(), "from-config");
        });

        let config = valid_config();
        temp_env::with_var_unset(TOKEN_ENV_VAR, || {
            assert!(admin_credential(&config).is_none());
        });
    }

    #[test]
    fn test_config_error_into_domain_error() {
        let err: DomainError = ConfigError::NoTargets.into();
        assert!(matches!(err, DomainError::Config(_)));
    }
}
