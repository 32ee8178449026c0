//! The `tryon prepare` command: run garment preparation locally.
//!
//! Compresses a garment image, optionally detects and crops the subject, and
//! writes the JPEG that would be uploaded.

use clap::Args;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tryon_core::{Config, CropRegion, GarmentPreparer, ImageMetadata, SubjectDetector, VisionProviderFactory};

use super::emit_json;

/// Arguments for the `prepare` command.
#[derive(Args, Debug)]
pub struct PrepareArgs {
    /// Garment image file
    #[arg(required = true)]
    pub input: PathBuf,

    /// Where to write the prepared JPEG
    #[arg(short, long, default_value = "garment.prepared.jpg")]
    pub output: PathBuf,

    /// Skip subject detection and cropping
    #[arg(long)]
    pub no_crop: bool,
}

/// Report printed after preparation.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PrepareReport {
    output: PathBuf,
    metadata: ImageMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    crop_region: Option<CropRegion>,
}

/// Execute the prepare command.
pub async fn execute(args: PrepareArgs) -> anyhow::Result<()> {
    let config = Config::load()?;
    let input = PathBuf::from(shellexpand::tilde(&args.input.to_string_lossy()).into_owned());
    let bytes = std::fs::read(&input)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", input.display()))?;

    let detector = if args.no_crop || !config.vision.enabled {
        SubjectDetector::disabled()
    } else {
        match VisionProviderFactory::create(&config.vision) {
            Ok(provider) => SubjectDetector::new(Arc::from(provider)),
            Err(e) => {
                tracing::warn!("Subject detection disabled: {e}");
                SubjectDetector::disabled()
            }
        }
    };

    let preparer = GarmentPreparer::new(config.compression.clone(), config.limits.clone(), detector);
    let prepared = preparer.prepare(bytes, args.no_crop).await?;
    std::fs::write(&args.output, &prepared.image.bytes)?;

    emit_json(
        &PrepareReport {
            output: args.output,
            metadata: prepared.image.metadata,
            crop_region: prepared.region,
        },
        None,
    )
}
