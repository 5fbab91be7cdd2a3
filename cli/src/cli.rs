//! CLI argument parsing with clap derive

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands;
use crate::output::OutputContext;

/// Build, test, and publish apps for the Loom workflow platform
#[derive(Parser)]
#[command(
    name = "loom",
    version,
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Validate, test, and upload app directories
    #[command(subcommand)]
    App(commands::app::AppCommand),

    /// Live development against a remote workflow
    #[command(subcommand)]
    Dev(commands::dev::DevCommand),

    /// Show version
    Version,
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn run(self) -> Result<()> {
        let Cli {
            json,
            quiet,
            no_color,
            command,
        } = self;
        match command {
            Command::Version => {
                commands::version::run(json);
                Ok(())
            }
            Command::App(cmd) => {
                let ctx = OutputContext::new(no_color, quiet);
                commands::app::run(&ctx, cmd).await
            }
            Command::Dev(cmd) => {
                let ctx = OutputContext::new(no_color, quiet);
                commands::dev::run(&ctx, cmd).await
            }
        }
    }
}
