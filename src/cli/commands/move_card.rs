//! `teamboard move`.

use anyhow::Result;
use clap::Args;

use crate::cli::commands::sync::RefreshOutput;
use crate::cli::context::AppContext;
use crate::cli::output::output;
use crate::cli::types::GlobalArgs;

#[derive(Args, Debug)]
pub struct MoveArgs {
    /// Card to move: #number, owner/repo#number or a cached issue id
    pub id: String,

    /// Target workflow state label
    pub state: String,
}

pub async fn execute(args: MoveArgs, global: &GlobalArgs) -> Result<()> {
    let ctx = AppContext::load(global).await?;
    let credential = ctx.session_credential()?;
    let id = ctx.resolve_card(&args.id)?;

    let issue = ctx.board.move_issue(&credential, &id, &args.state).await?;
    output(&RefreshOutput::from(&issue), global.json);
    Ok(())
}
