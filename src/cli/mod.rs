//! Command-line interface for the complaint box.

mod commands;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Complaint Box - anonymous complaint collection
#[derive(Parser)]
#[command(name = "complaint-box")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the web server (default)
    #[command(alias = "web")]
    Serve,

    /// Copy a local SQLite database into the live database
    Migrate(MigrateArgs),

    /// Set or reset the admin password
    #[command(alias = "passwd")]
    SetPassword(SetPasswordArgs),

    /// Create default config file
    Init,
}

#[derive(Args, Debug, Clone)]
pub struct MigrateArgs {
    /// Path to the SQLite database file
    #[arg(long, default_value = "local.db")]
    pub sqlite: PathBuf,

    /// Target database URL
    #[arg(long, env = "DATABASE_URL")]
    pub target: Option<String>,

    /// Clear the target tables if they already contain rows
    #[arg(long)]
    pub force: bool,
}

#[derive(Args, Debug, Clone)]
pub struct SetPasswordArgs {
    /// New password (prompted for when omitted)
    #[arg(short, long)]
    pub password: Option<String>,

    /// Database URL (defaults to the configured database)
    #[arg(short, long)]
    pub target: Option<String>,
}

pub use commands::*;
