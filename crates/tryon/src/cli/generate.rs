//! The `tryon generate` command: run one try-on end to end.

use clap::Args;
use std::path::PathBuf;
use tryon_core::{Config, GenerateOptions, InMemorySessionStore, TryOnPipeline, TryOnSession};

use super::{emit_json, load_image, spinner};

/// Arguments for the `generate` command.
#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Customer photo: file path, URL, data URI, or base64
    #[arg(required = true)]
    pub customer: String,

    /// Garment photo: file path, URL, data URI, or base64
    #[arg(required = true)]
    pub garment: String,

    /// Product name used in fit notes
    #[arg(short, long, default_value = "garment")]
    pub label: String,

    /// Return right after submission instead of polling
    #[arg(long)]
    pub no_wait: bool,

    /// Skip subject detection and cropping of the garment
    #[arg(long)]
    pub no_crop: bool,

    /// Polling budget in milliseconds (overrides config)
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Force demo mode (no network calls)
    #[arg(long)]
    pub demo: bool,

    /// Track the run as a session with this id and log its final state
    #[arg(long)]
    pub session: Option<String>,

    /// Write the result JSON here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Execute the generate command.
pub async fn execute(args: GenerateArgs) -> anyhow::Result<()> {
    let mut config = Config::load()?;
    if args.demo {
        config.demo.enabled = true;
    }

    let pipeline = TryOnPipeline::new(&config)?;
    let customer = load_image(&args.customer)?;
    let garment = load_image(&args.garment)?;
    let options = GenerateOptions {
        wait_for_completion: !args.no_wait,
        skip_crop: args.no_crop,
        poll_timeout_ms: args.timeout_ms,
    };

    let pb = spinner(&format!("Generating try-on for {}...", args.label))?;
    let result = match &args.session {
        Some(session_id) => {
            let store = InMemorySessionStore::new();
            store.insert(TryOnSession::new(
                session_id,
                "cli",
                &customer.describe(),
                &garment.describe(),
            ));
            let result = pipeline
                .generate_for_session(session_id, &store, &customer, &garment, &args.label, &options)
                .await;
            if let Some(session) = store.get(session_id) {
                tracing::info!("Session {} is {:?}", session.id, session.status);
            }
            result
        }
        None => pipeline.generate(&customer, &garment, &args.label, &options).await,
    };
    pb.finish_and_clear();

    emit_json(&result, args.output.as_ref())?;

    if !result.success && !result.requires_polling {
        anyhow::bail!(
            "Try-on failed: {}",
            result.error.as_deref().unwrap_or("unknown error")
        );
    }
    if result.requires_polling {
        tracing::info!(
            "Job still {}; resume with `tryon poll <status-url>`",
            result.processing_status.as_deref().unwrap_or("pending")
        );
    }
    Ok(())
}
