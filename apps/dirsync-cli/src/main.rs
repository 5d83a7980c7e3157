//! aegee-dirsync - report drift between MyAEGEE and Google Workspace
//!
//! This CLI enables board members to:
//! - List body members who are missing from the members mailing list
//! - List mailing list subscribers who are no longer members
//! - List members without a Google Workspace account, and accounts without a member

use clap::Parser;

use dirsync_cli::cli::{Cli, Commands};
use dirsync_cli::commands;
use dirsync_cli::error::CliResult;
use dirsync_cli::logging::init_logging;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.global.verbose, cli.global.quiet);

    let result = run(cli).await;

    match result {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            e.print();
            std::process::exit(e.exit_code());
        }
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    let mut stdout = std::io::stdout();
    match cli.command {
        Commands::MembersSync | Commands::ActivesSync => {
            commands::sync::execute(&cli.global, cli.command.mode(), &mut stdout).await
        }
    }
}
