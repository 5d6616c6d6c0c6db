//! `teamboard create`.

use anyhow::Result;
use clap::Args;

use crate::cli::commands::sync::RefreshOutput;
use crate::cli::context::AppContext;
use crate::cli::output::output;
use crate::cli::types::GlobalArgs;
use crate::domain::models::{NewIssue, TrackerTarget};

#[derive(Args, Debug)]
pub struct CreateArgs {
    /// Issue title
    #[arg(short, long)]
    pub title: String,

    /// Issue body (Markdown)
    #[arg(short, long)]
    pub body: Option<String>,

    /// Label to apply (repeatable)
    #[arg(short, long = "label")]
    pub labels: Vec<String>,

    /// Milestone number
    #[arg(long)]
    pub milestone: Option<u64>,

    /// Login of the assignee
    #[arg(long)]
    pub assignee: Option<String>,

    /// Repository as owner/repo; defaults to the first configured target
    #[arg(short, long, value_name = "OWNER/REPO")]
    pub repo: Option<TrackerTarget>,
}

impl From<CreateArgs> for NewIssue {
    fn from(args: CreateArgs) -> Self {
        Self {
            title: args.title,
            body: args.body,
            labels: (!args.labels.is_empty()).then_some(args.labels),
            milestone: args.milestone,
            assignee: args.assignee,
        }
    }
}

pub async fn execute(mut args: CreateArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = AppContext::load(global).await?;
    let credential = ctx.session_credential()?;
    let target = ctx.target_or_default(args.repo.take())?;

    let issue = ctx
        .board
        .create_issue(&credential, &target, &NewIssue::from(args))
        .await?;
    output(&RefreshOutput::from(&issue), global.json);
    Ok(())
}
