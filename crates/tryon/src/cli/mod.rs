//! CLI command implementations.

pub mod config;
pub mod generate;
pub mod poll;
pub mod prepare;

use std::path::PathBuf;
use tryon_core::ImageInput;

/// Interpret an image argument.
///
/// URLs and data URIs are passed through, an existing file path is read into
/// memory, and anything else is taken as canonical base64.
pub fn load_image(arg: &str) -> anyhow::Result<ImageInput> {
    let reference = ImageInput::from_reference(arg);
    if !matches!(reference, ImageInput::Base64(_)) {
        return Ok(reference);
    }

    let path = PathBuf::from(shellexpand::tilde(arg).into_owned());
    if path.is_file() {
        let bytes = std::fs::read(&path)
            .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", path.display()))?;
        return Ok(ImageInput::Bytes(bytes));
    }

    Ok(reference)
}

/// Write JSON to a file, or pretty-print it to stdout.
pub fn emit_json<T: serde::Serialize>(value: &T, output: Option<&PathBuf>) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => {
            std::fs::write(path, json)?;
            tracing::info!("Wrote {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}

/// A steady spinner on stderr while a long call runs.
pub fn spinner(message: &str) -> anyhow::Result<indicatif::ProgressBar> {
    use indicatif::{ProgressBar, ProgressStyle};

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")?);
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(120));
    Ok(pb)
}
