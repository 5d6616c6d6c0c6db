//! CLI type definitions
//!
//! This module contains clap command structures that define the CLI interface.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::cli::commands::board::{BoardArgs, ShowArgs};
use crate::cli::commands::create::CreateArgs;
use crate::cli::commands::init::InitArgs;
use crate::cli::commands::labels::LabelsArgs;
use crate::cli::commands::move_card::MoveArgs;
use crate::cli::commands::sync::{RefreshArgs, SyncArgs};

#[derive(Parser, Debug)]
#[command(name = "teamboard")]
#[command(about = "TeamBoard - GitHub issue board with a local cache", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[command(flatten)]
    pub global: GlobalArgs,
}

/// Options shared by every command.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Output in JSON format
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Read configuration from this file instead of .teamboard/
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Session token for board writes; defaults to the admin token
    #[arg(long, global = true, env = "TEAMBOARD_SESSION_TOKEN", hide_env_values = true)]
    pub token: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Write a starter configuration and create the cache database
    Init(InitArgs),

    /// Run one incremental sync of every configured repository
    Sync(SyncArgs),

    /// Re-fetch one issue and all of its comments
    Refresh(RefreshArgs),

    /// Show the board from the local cache
    Board(BoardArgs),

    /// Show one card with its comments and task links
    Show(ShowArgs),

    /// Create an issue and add it to the board
    Create(CreateArgs),

    /// Move a card to another workflow state
    Move(MoveArgs),

    /// Create missing workflow state labels in every repository
    Labels(LabelsArgs),
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_move_with_global_flags() {
        let cli = Cli::try_parse_from(["teamboard", "move", "0123abcd", "In Progress", "--json"]).unwrap();
        assert!(cli.global.json);
        match cli.command {
            Commands::Move(args) => {
                assert_eq!(args.id, "0123abcd");
                assert_eq!(args.state, "In Progress");
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_create() {
        let cli = Cli::try_parse_from([
            "teamboard", "create", "--title", "Ship it", "--label", "bug", "--label", "Backlog",
            "--repo", "acme/board",
        ])
        .unwrap();
        let Commands::Create(args) = cli.command else {
            panic!("expected create");
        };
        assert_eq!(args.labels, vec!["bug", "Backlog"]);
        assert_eq!(args.repo.unwrap().to_string(), "acme/board");
    }

    #[test]
    fn test_init_rejects_bad_repo() {
        assert!(Cli::try_parse_from(["teamboard", "init", "--repo", "no-slash"]).is_err());
    }
}
