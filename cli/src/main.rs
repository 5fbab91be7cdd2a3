//! Loom CLI - build, test, and publish apps for the Loom workflow platform

use clap::Parser;

use loom_cli::cli::Cli;
use loom_cli::config::ApiConfig;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if !cli.quiet && ApiConfig::from_env().token.is_empty() {
        eprintln!("hint: set LOOM_APIKEY (or LOOM_AUTHORIZATION) to enable upload and sync");
    }
    if let Err(e) = cli.run().await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
