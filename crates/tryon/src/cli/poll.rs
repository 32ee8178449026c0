//! The `tryon poll` command: resume polling an accepted job.

use clap::Args;
use std::path::PathBuf;
use tryon_core::provider::resolve_status_url;
use tryon_core::{Config, TryOnPipeline};

use super::{emit_json, spinner};

/// Arguments for the `poll` command.
#[derive(Args, Debug)]
pub struct PollArgs {
    /// Status URL returned by `generate --no-wait` (relative paths use the configured base URL)
    #[arg(required = true)]
    pub status_url: String,

    /// Polling budget in milliseconds (overrides config)
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Write the result JSON here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Execute the poll command.
pub async fn execute(args: PollArgs) -> anyhow::Result<()> {
    let config = Config::load()?;
    let pipeline = TryOnPipeline::new(&config)?;
    let status_url = resolve_status_url(&config.provider.base_url, &args.status_url);

    let pb = spinner(&format!("Polling {status_url}..."))?;
    let result = pipeline.poll(&status_url, args.timeout_ms).await;
    pb.finish_and_clear();

    emit_json(&result, args.output.as_ref())?;
    if !result.success && !result.requires_polling {
        anyhow::bail!(
            "Try-on failed: {}",
            result.error.as_deref().unwrap_or("unknown error")
        );
    }
    Ok(())
}
