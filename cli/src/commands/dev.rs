//! `loom dev` — live development against a remote workflow.

use anyhow::{Result, bail};
use clap::{Args, Subcommand};

use crate::client::LoomClient;
use crate::config::{self, ApiConfig};
use crate::output::OutputContext;
use crate::sync::{SyncSession, SyncTarget};

#[derive(Subcommand)]
pub enum DevCommand {
    /// Mirror a local file into a workflow parameter until interrupted
    Run(RunArgs),
}

#[derive(Args)]
pub struct RunArgs {
    /// Workflow URL pasted from the UI; its query string must carry
    /// action_id, action_name=execute_python and field=code
    pub url: String,
}

/// Dispatch a `dev` subcommand.
///
/// # Errors
///
/// Returns an error when the sync session cannot start or its local file
/// becomes unreadable.
pub async fn run(ctx: &OutputContext, cmd: DevCommand) -> Result<()> {
    match cmd {
        DevCommand::Run(args) => run_sync(ctx, &args.url).await,
    }
}

async fn run_sync(ctx: &OutputContext, raw_url: &str) -> Result<()> {
    let api = ApiConfig::from_env();
    if api.token.is_empty() {
        bail!("no API token configured; set LOOM_APIKEY (or LOOM_AUTHORIZATION)");
    }

    let target = SyncTarget::parse(raw_url)?;
    let session = SyncSession::new(LoomClient::new(api), target, &config::code_dir()?);
    session.run(ctx).await?;
    Ok(())
}
