//! `loom app` — validate, smoke-test, package, and upload app directories.

use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use clap::{Args, Subcommand};

use crate::archive;
use crate::client::LoomClient;
use crate::command_runner::TokioCommandRunner;
use crate::config::{self, ApiConfig};
use crate::output::{OutputContext, progress};
use crate::sandbox::HandlerSandbox;
use crate::validate::{self, AppLayout, ValidationReport};

#[derive(Subcommand)]
pub enum AppCommand {
    /// Check directory structure and manifest consistency
    Validate(DirArgs),

    /// Validate, then smoke-test the handler locally
    Test(DirArgs),

    /// Synonym for `test`
    #[command(hide = true)]
    Run(DirArgs),

    /// Validate, smoke-test, package, and upload the app
    Upload(DirArgs),
}

#[derive(Args)]
pub struct DirArgs {
    /// App directory containing api.yaml (defaults to the current directory)
    #[arg(default_value = ".")]
    pub dir: PathBuf,
}

/// Dispatch an `app` subcommand.
///
/// # Errors
///
/// Returns an error when the selected pipeline stage fails.
pub async fn run(ctx: &OutputContext, cmd: AppCommand) -> Result<()> {
    match cmd {
        AppCommand::Validate(args) => validate_cmd(ctx, &args.dir),
        AppCommand::Test(args) | AppCommand::Run(args) => test_cmd(ctx, &args.dir).await,
        AppCommand::Upload(args) => upload_cmd(ctx, &args.dir).await,
    }
}

/// Standalone validation: every defect is reported, then a non-empty report
/// escalates to one aggregate failure.
fn validate_cmd(ctx: &OutputContext, dir: &Path) -> Result<()> {
    let layout = AppLayout::resolve(dir)?;
    let (manifest, report) = validate::validate(&layout)?;
    report_defects(ctx, &report);
    if !report.is_clean() {
        bail!("validation found defects: {}", report.summary());
    }
    ctx.success(&format!(
        "{} {} passed validation",
        manifest.name, manifest.app_version
    ));
    Ok(())
}

/// Validate (defects are warnings here) and smoke-test the handler.
async fn test_cmd(ctx: &OutputContext, dir: &Path) -> Result<()> {
    let layout = AppLayout::resolve(dir)?;
    let (_, report) = validate::validate(&layout)?;
    report_defects(ctx, &report);
    run_sandbox(ctx, &layout).await?;
    ctx.success("handler smoke test passed");
    Ok(())
}

/// The full pipeline: validate, smoke-test, package, upload.
async fn upload_cmd(ctx: &OutputContext, dir: &Path) -> Result<()> {
    let api = ApiConfig::from_env();
    if api.token.is_empty() {
        bail!("no API token configured; set LOOM_APIKEY (or LOOM_AUTHORIZATION)");
    }

    let layout = AppLayout::resolve(dir)?;
    let (manifest, report) = validate::validate(&layout)?;
    report_defects(ctx, &report);
    run_sandbox(ctx, &layout).await?;

    let pb = progress::spinner(ctx, "packaging app");
    let result = archive::pack(&layout.root);
    pb.finish_and_clear();
    let archive_path = result?;
    ctx.success(&format!("packaged {}", archive_path.display()));

    let pb = progress::spinner(ctx, &format!("uploading to {}", api.base_url));
    let client = LoomClient::new(api);
    let result = client.upload_app(&archive_path).await;
    pb.finish_and_clear();
    result?;
    ctx.success(&format!(
        "uploaded {} {}",
        manifest.name, manifest.app_version
    ));
    Ok(())
}

async fn run_sandbox(ctx: &OutputContext, layout: &AppLayout) -> Result<()> {
    let workdir = match config::workdir_override() {
        Some(dir) => dir,
        None => config::code_dir()?,
    };
    let sandbox = HandlerSandbox::new(TokioCommandRunner, workdir);
    sandbox.run(layout, ctx).await?;
    Ok(())
}

fn report_defects(ctx: &OutputContext, report: &ValidationReport) {
    for detail in report.details() {
        ctx.warn(detail);
    }
}
