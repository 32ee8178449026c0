//! Bounded-dimension JPEG compression for images bound for the network.

use image::imageops::FilterType;

use crate::config::{CompressionConfig, LimitsConfig};
use crate::error::PipelineResult;
use crate::types::{ImageMetadata, PreparedImage};

use super::decode::{encode_jpeg, run_blocking, ImageDecoder};

/// Downscales and re-encodes images within configured bounds.
#[derive(Clone)]
pub struct Compressor {
    options: CompressionConfig,
    decoder: ImageDecoder,
}

impl Compressor {
    pub fn new(options: CompressionConfig, limits: LimitsConfig) -> Self {
        Self {
            options,
            decoder: ImageDecoder::new(limits),
        }
    }

    /// Compress on the blocking pool, bounded by the decode timeout.
    pub async fn compress(&self, bytes: Vec<u8>) -> PipelineResult<PreparedImage> {
        let this = self.clone();
        run_blocking("compress", self.decoder.timeout_ms(), move || {
            this.compress_sync(&bytes)
        })
        .await
    }

    /// Decode, downscale if either bound is exceeded, and re-encode as JPEG.
    pub fn compress_sync(&self, bytes: &[u8]) -> PipelineResult<PreparedImage> {
        let decoded = self.decoder.decode(bytes)?;
        let (width, height) = fit_within(
            decoded.width,
            decoded.height,
            self.options.max_width,
            self.options.max_height,
        );

        let image = if (width, height) == (decoded.width, decoded.height) {
            decoded.image
        } else {
            tracing::trace!(
                "  Resize {}x{} -> {}x{}",
                decoded.width,
                decoded.height,
                width,
                height
            );
            decoded.image.resize_exact(width, height, FilterType::Lanczos3)
        };

        let encoded = encode_jpeg(&image, self.options.quality)?;
        let metadata = ImageMetadata::new(decoded.byte_size, encoded.len() as u64, width, height);
        tracing::debug!(
            "Compressed {} -> {} bytes ({:.2}x) at {}x{}",
            metadata.original_size,
            metadata.processed_size,
            metadata.compression_ratio,
            width,
            height
        );

        Ok(PreparedImage {
            bytes: encoded,
            metadata,
        })
    }
}

/// Scale `(width, height)` down so both bounds hold, preserving aspect ratio.
///
/// Dimensions already inside the bounds are returned unchanged. Neither
/// output dimension drops below 1.
pub fn fit_within(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if width <= max_width && height <= max_height {
        return (width, height);
    }

    let (w, h) = (width as u64, height as u64);
    let (mw, mh) = (max_width as u64, max_height as u64);

    // Width is the binding constraint when w/mw >= h/mh
    if w * mh >= h * mw {
        let scaled_h = (h * mw / w).max(1);
        (max_width, scaled_h as u32)
    } else {
        let scaled_w = (w * mh / h).max(1);
        (scaled_w as u32, max_height)
    }
}
