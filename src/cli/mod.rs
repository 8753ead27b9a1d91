//! Command-line interface for Component
//!
//! Provides the main CLI structure using clap with subcommands for:
//! - `build`: Compute the chunk graph of a module graph
//! - `init`: Write a starter component.toml

mod build;
mod init;

use anyhow::Result;
use clap::{Parser, Subcommand};
use colored::Colorize;

pub use build::BuildCommand;
pub use init::InitCommand;

/// Component chunk graph core - code splitting, shared chunks and stable ids
#[derive(Parser, Debug)]
#[command(name = "component-chunks")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to component.toml config file
    #[arg(short, long, global = true, default_value = "component.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build, optimize and seal the chunk graph of a module graph
    Build(BuildCommand),

    /// Write a starter component.toml
    Init(InitCommand),
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(&self) -> Result<()> {
        print_banner();

        match &self.command {
            Commands::Build(cmd) => cmd.execute(&self.config).await,
            Commands::Init(cmd) => cmd.execute().await,
        }
    }
}

/// Print the Component banner
fn print_banner() {
    eprintln!(
        "\n{} {} {}\n",
        "⚡".cyan(),
        "Component chunks".bold().cyan(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
}
