//! Command-line arguments

use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

use dirsync_core::SyncMode;

use crate::config::DEFAULT_BODY_ID;
use crate::output::OutputFormat;

/// Report differences between MyAEGEE and the AEGEE-München Google Workspace
#[derive(Parser, Debug)]
#[command(name = "aegee-dirsync")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by every subcommand.
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// MyAEGEE username
    #[arg(long, env = "MYAEGEE_USER", global = true)]
    pub myaegee_user: Option<String>,

    /// MyAEGEE password
    #[arg(long, env = "MYAEGEE_PASS", hide_env_values = true, global = true)]
    pub myaegee_pass: Option<String>,

    /// MyAEGEE body whose members are compared
    #[arg(long, default_value_t = DEFAULT_BODY_ID, global = true)]
    pub body_id: i64,

    /// Google OAuth client secrets (installed application)
    #[arg(long, default_value = "credentials.json", global = true)]
    pub credentials_file: PathBuf,

    /// OAuth token cache [default: <config dir>/token.json]
    #[arg(long, global = true)]
    pub token_file: Option<PathBuf>,

    /// Configuration file [default: <config dir>/config.json]
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Report format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub output: OutputFormat,

    /// More log output on stderr (repeatable)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Commands {
    /// Compare MyAEGEE body members with the members mailing list
    MembersSync,

    /// Compare MyAEGEE body members with Google Workspace accounts
    ActivesSync,
}

impl Commands {
    pub fn mode(&self) -> SyncMode {
        match self {
            Commands::MembersSync => SyncMode::MembersSync,
            Commands::ActivesSync => SyncMode::ActivesSync,
        }
    }
}
