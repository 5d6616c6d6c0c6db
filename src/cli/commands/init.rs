//! Implementation of the `teamboard init` command.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use tokio::fs;

use crate::adapters::sqlite::initialize_database;
use crate::cli::output::{output, CommandOutput};
use crate::cli::types::GlobalArgs;
use crate::domain::models::{Config, TrackerTarget, WorkflowState};
use crate::infrastructure::config::CONFIG_DIR;

#[derive(Args, Debug)]
pub struct InitArgs {
    /// Overwrite an existing configuration
    #[arg(long, short)]
    pub force: bool,

    /// Repository to mirror, as owner/repo (repeatable)
    #[arg(long = "repo", value_name = "OWNER/REPO")]
    pub repos: Vec<TrackerTarget>,

    /// Project directory (defaults to current directory)
    #[arg(default_value = ".")]
    pub path: PathBuf,
}

#[derive(Debug, serde::Serialize)]
pub struct InitOutput {
    pub success: bool,
    pub message: String,
    pub config_path: PathBuf,
    pub database_path: PathBuf,
    pub targets: Vec<String>,
}

impl CommandOutput for InitOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![self.message.clone()];
        if self.success {
            lines.push(format!("\nConfiguration: {}", self.config_path.display()));
            lines.push(format!("Database:      {}", self.database_path.display()));
            if self.targets.is_empty() {
                lines.push("\nNo repositories yet: add them under `targets` before syncing.".to_string());
            } else {
                lines.push(format!("Repositories:  {}", self.targets.join(", ")));
            }
        }
        lines.join("\n")
    }
}

/// Configuration written by `init`: the given repositories and a
/// three-column starter board.
pub fn starter_config(targets: Vec<TrackerTarget>) -> Config {
    let mut config = Config {
        targets,
        ..Config::default()
    };
    config.board.states = vec![
        WorkflowState::new("Backlog", "ededed"),
        WorkflowState::new("In Progress", "fbca04"),
        WorkflowState::new("Done", "0e8a16"),
    ];
    config.board.project_label = Some("Project".to_string());
    config
}

pub async fn execute(args: InitArgs, global: &GlobalArgs) -> Result<()> {
    let project_dir = if args.path.is_absolute() {
        args.path.clone()
    } else {
        std::env::current_dir()
            .context("Failed to get current directory")?
            .join(&args.path)
    };
    let config_dir = project_dir.join(CONFIG_DIR);
    let config_path = config_dir.join("config.yaml");

    if config_path.exists() && !args.force {
        let output_data = InitOutput {
            success: false,
            message: "Project already initialized. Use --force to overwrite the configuration."
                .to_string(),
            config_path,
            database_path: PathBuf::new(),
            targets: vec![],
        };
        output(&output_data, global.json);
        return Ok(());
    }

    fs::create_dir_all(&config_dir)
        .await
        .with_context(|| format!("Failed to create {}", config_dir.display()))?;

    let mut config = starter_config(args.repos);
    write_config(&config_path, &config).await?;

    // The database path in the file stays relative; open it from the project root.
    let database_path = project_dir.join(&config.database.path);
    config.database.path = database_path.display().to_string();
    let pool = initialize_database(&config.database)
        .await
        .context("Failed to initialize database")?;
    pool.close().await;

    let output_data = InitOutput {
        success: true,
        message: if args.force {
            "Project reinitialized successfully.".to_string()
        } else {
            "Project initialized successfully.".to_string()
        },
        config_path,
        database_path,
        targets: config.targets.iter().map(ToString::to_string).collect(),
    };
    output(&output_data, global.json);
    Ok(())
}

async fn write_config(path: &Path, config: &Config) -> Result<()> {
    let yaml = serde_yaml::to_string(config).context("Failed to serialize configuration")?;
    fs::write(path, yaml)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::config::ConfigLoader;

    #[tokio::test]
    async fn test_init_writes_loadable_config_and_database() {
        let dir = tempfile::tempdir().unwrap();
        let args = InitArgs {
            force: false,
            repos: vec![TrackerTarget::new("acme", "board")],
            path: dir.path().to_path_buf(),
        };

        execute(args, &GlobalArgs::default()).await.unwrap();

        let config_path = dir.path().join(CONFIG_DIR).join("config.yaml");
        let config = ConfigLoader::load_from_file(&config_path).unwrap();
        assert_eq!(config.targets, vec![TrackerTarget::new("acme", "board")]);
        assert_eq!(config.board.states.len(), 3);
        assert_eq!(config.database.path, ".teamboard/teamboard.db");
        assert!(dir.path().join(".teamboard/teamboard.db").exists());
    }

    #[tokio::test]
    async fn test_init_keeps_existing_config_without_force() {
        let dir = tempfile::tempdir().unwrap();
        let config_dir = dir.path().join(CONFIG_DIR);
        std::fs::create_dir_all(&config_dir).unwrap();
        std::fs::write(config_dir.join("config.yaml"), "targets: []\n").unwrap();

        let args = InitArgs {
            force: false,
            repos: vec![TrackerTarget::new("acme", "board")],
            path: dir.path().to_path_buf(),
        };
        execute(args, &GlobalArgs::default()).await.unwrap();

        let contents = std::fs::read_to_string(config_dir.join("config.yaml")).unwrap();
        assert_eq!(contents, "targets: []\n");
    }
}
