//! TeamBoard CLI entry point.

use clap::Parser;

use teamboard::cli::commands::{board, create, init, labels, move_card, sync};
use teamboard::cli::{Cli, Commands};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    let global = &cli.global;

    let result = match cli.command {
        Commands::Init(args) => init::execute(args, global).await,
        Commands::Sync(args) => sync::execute(args, global).await,
        Commands::Refresh(args) => sync::execute_refresh(args, global).await,
        Commands::Board(args) => board::execute(args, global).await,
        Commands::Show(args) => board::execute_show(args, global).await,
        Commands::Create(args) => create::execute(args, global).await,
        Commands::Move(args) => move_card::execute(args, global).await,
        Commands::Labels(args) => labels::execute(args, global).await,
    };

    if let Err(err) = result {
        teamboard::cli::handle_error(err, global.json);
    }
}
