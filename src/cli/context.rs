//! Wiring shared by the commands that talk to the cache or the tracker.

use std::sync::Arc;

use anyhow::{Context, Result};

use crate::adapters::github::GitHubClient;
use crate::adapters::sqlite::{initialize_database, SqliteIssueStore};
use crate::cli::types::GlobalArgs;
use crate::domain::models::{Config, Credential, IssueId, TrackerTarget};
use crate::infrastructure::config::{admin_credential, ConfigLoader};
use crate::infrastructure::logging::{LogConfig, LoggerImpl};
use crate::services::{parse_reference, BoardService, SyncEngine, SyncSettings};

pub type Engine = SyncEngine<SqliteIssueStore, GitHubClient>;
pub type Board = BoardService<SqliteIssueStore, GitHubClient>;

pub struct AppContext {
    pub config: Config,
    pub engine: Arc<Engine>,
    pub board: Board,
    session_token: Option<String>,
    _logger: LoggerImpl,
}

impl AppContext {
    /// Load configuration, start logging, open the cache and build the services.
    pub async fn load(global: &GlobalArgs) -> Result<Self> {
        let config = match &global.config {
            Some(path) => ConfigLoader::load_from_file(path)?,
            None => ConfigLoader::load()?,
        };

        let log_config = LogConfig::try_from(&config.logging)?;
        let logger = LoggerImpl::init(&log_config)?;

        let pool = initialize_database(&config.database)
            .await
            .with_context(|| format!("Failed to open database at {}", config.database.path))?;
        let store = Arc::new(SqliteIssueStore::new(pool));
        let tracker = Arc::new(GitHubClient::with_config(&config.github)?);

        let engine = SyncEngine::new(store, tracker, SyncSettings::from_config(&config));
        if let Some(credential) = admin_credential(&config) {
            engine.set_admin_credential(credential);
        }
        let engine = Arc::new(engine);
        let board = BoardService::new(engine.clone(), config.github.admin_login.clone());

        Ok(Self {
            config,
            engine,
            board,
            session_token: global.token.clone(),
            _logger: logger,
        })
    }

    /// Credential for user-triggered writes: the session token if one was
    /// given, otherwise the admin credential.
    pub fn session_credential(&self) -> Result<Credential> {
        match &self.session_token {
            Some(token) => Ok(Credential::new(token.clone())?),
            None => admin_credential(&self.config).context(
                "No credential available: pass --token, set github.token or export GITHUB_TOKEN",
            ),
        }
    }

    /// The repository a command acts on: the one given, else the first configured.
    pub fn target_or_default(&self, repo: Option<TrackerTarget>) -> Result<TrackerTarget> {
        repo.or_else(|| self.config.targets.first().cloned())
            .context("No repository given and none configured")
    }

    /// Resolve a card argument: `#42` or `owner/repo#42`, else a stored id.
    pub fn resolve_card(&self, input: &str) -> Result<IssueId> {
        resolve_card_id(input, self.config.targets.first(), &self.config.github.api_base)
    }
}

fn resolve_card_id(input: &str, default_target: Option<&TrackerTarget>, api_base: &str) -> Result<IssueId> {
    let input = input.trim();
    match parse_reference(input) {
        Ok(reference) => {
            let target = default_target.context("No repository configured to resolve a local reference")?;
            Ok(reference.resolve(target, api_base))
        }
        Err(_) => Ok(IssueId::from_stored(input)),
    }
}
