//! In-memory image decoding and JPEG encoding.
//!
//! All raster work happens on byte buffers; nothing touches the filesystem,
//! so every exit path releases its buffers when they go out of scope.

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, GenericImageView, ImageFormat};
use std::io::Cursor;
use std::time::Duration;
use tokio::time::timeout;

use crate::config::LimitsConfig;
use crate::error::{PipelineError, PipelineResult};

use super::validate::Validator;

/// Result of decoding an image.
#[derive(Debug)]
pub struct DecodedImage {
    /// The decoded image data
    pub image: DynamicImage,
    /// Detected image format
    pub format: ImageFormat,
    /// Image width in pixels
    pub width: u32,
    /// Image height in pixels
    pub height: u32,
    /// Encoded input size in bytes
    pub byte_size: u64,
}

/// Image decoder with validation against configured limits.
#[derive(Clone)]
pub struct ImageDecoder {
    limits: LimitsConfig,
}

impl ImageDecoder {
    /// Create a new decoder with the given limits.
    pub fn new(limits: LimitsConfig) -> Self {
        Self { limits }
    }

    /// Decode timeout from the configured limits.
    pub fn timeout_ms(&self) -> u64 {
        self.limits.decode_timeout_ms
    }

    /// Validate and decode an encoded image held in memory.
    pub fn decode(&self, bytes: &[u8]) -> PipelineResult<DecodedImage> {
        Validator::new(self.limits.clone()).validate(bytes)?;

        let reader = image::ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()
            .map_err(|e| PipelineError::processing("decode", format!("Cannot detect image format: {e}")))?;
        let format = reader
            .format()
            .ok_or_else(|| PipelineError::processing("decode", "Unsupported image format"))?;
        let image = reader
            .decode()
            .map_err(|e| PipelineError::processing("decode", e.to_string()))?;

        let (width, height) = image.dimensions();
        Ok(DecodedImage {
            image,
            format,
            width,
            height,
            byte_size: bytes.len() as u64,
        })
    }
}

/// Encode an image as baseline JPEG at the given quality.
///
/// Alpha is dropped; JPEG has no transparency.
pub fn encode_jpeg(image: &DynamicImage, quality: u8) -> PipelineResult<Vec<u8>> {
    let mut buffer = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut buffer, quality);
    DynamicImage::ImageRgb8(image.to_rgb8())
        .write_with_encoder(encoder)
        .map_err(|e| PipelineError::processing("encode", e.to_string()))?;
    Ok(buffer)
}

/// Run CPU-bound raster work off the async runtime, bounded by a timeout.
pub async fn run_blocking<T, F>(stage: &str, timeout_ms: u64, work: F) -> PipelineResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> PipelineResult<T> + Send + 'static,
{
    let result = timeout(
        Duration::from_millis(timeout_ms),
        tokio::task::spawn_blocking(work),
    )
    .await;

    match result {
        Ok(Ok(inner)) => inner,
        Ok(Err(e)) => Err(PipelineError::processing(stage, format!("Task join error: {e}"))),
        Err(_) => Err(PipelineError::Timeout {
            stage: stage.to_string(),
            timeout_ms,
        }),
    }
}
