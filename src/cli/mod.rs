use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "orgsentry")]
#[command(about = "Multi-stage security verdict engine for organization-scoped actions")]
#[command(version)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, default_value = "orgsentry.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the verdict engine HTTP server
    Serve,
    /// Show aggregated verdict statistics
    Status,
    /// View audit log entries
    Logs {
        /// Show last N entries
        #[arg(long, default_value = "50")]
        tail: usize,
        /// Export the full log instead of tailing
        #[arg(long)]
        export: bool,
        /// Export format (json or csv)
        #[arg(long, default_value = "json")]
        format: String,
    },
    /// Write a default config file and create the database schema
    Init,
}
