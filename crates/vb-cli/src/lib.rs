//! vb CLI library

pub mod commands;
pub mod config;
pub mod error;

pub use error::{Error, Result};

use clap::{Parser, Subcommand};

/// vb - submit Velero backup requests
#[derive(Parser, Debug)]
#[command(name = "vb")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Submit an on-demand backup request
    Backup(commands::backup::BackupArgs),
}

impl Cli {
    /// Run the CLI command
    pub async fn run(self) -> Result<()> {
        match self.command {
            Commands::Backup(args) => commands::backup::run(args).await,
        }
    }
}
