//! Relative crop regions and sub-raster extraction.

use serde::{Deserialize, Serialize};

use crate::config::{CompressionConfig, LimitsConfig};
use crate::error::{PipelineError, PipelineResult};
use crate::types::{ImageMetadata, PreparedImage};

use super::decode::{encode_jpeg, run_blocking, ImageDecoder};

/// A bounding box relative to image dimensions, every field in [0, 1].
///
/// Invariant after [`CropRegion::clamped`]: `left + width <= 1` and
/// `top + height <= 1`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropRegion {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

impl CropRegion {
    pub fn new(left: f64, top: f64, width: f64, height: f64) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Whether every field is a finite number.
    pub fn is_finite(&self) -> bool {
        [self.left, self.top, self.width, self.height]
            .iter()
            .all(|v| v.is_finite())
    }

    /// Pull every field into [0, 1] and shrink the box to stay inside the frame.
    pub fn clamped(self) -> Self {
        let left = self.left.clamp(0.0, 1.0);
        let top = self.top.clamp(0.0, 1.0);
        Self {
            left,
            top,
            width: self.width.clamp(0.0, 1.0 - left),
            height: self.height.clamp(0.0, 1.0 - top),
        }
    }

    /// Convert to absolute pixels against a `width` x `height` source.
    ///
    /// The origin is rounded and clamped to the frame. Each side is capped at
    /// `floor(source - offset)` measured from the unrounded offset, so the box
    /// never exceeds the space the relative region leaves. Returns `None` for
    /// an empty box.
    pub fn to_pixels(&self, width: u32, height: u32) -> Option<PixelRect> {
        let (x, rect_w) = axis_to_pixels(self.left, self.width, width);
        let (y, rect_h) = axis_to_pixels(self.top, self.height, height);
        let rect = PixelRect {
            x,
            y,
            width: rect_w,
            height: rect_h,
        };
        (rect.width > 0 && rect.height > 0).then_some(rect)
    }
}

/// Map one relative axis `(offset, extent)` onto `size` pixels.
fn axis_to_pixels(offset: f64, extent: f64, size: u32) -> (u32, u32) {
    let size_f = size as f64;
    let start = (offset * size_f).clamp(0.0, size_f);
    let origin = start.round() as u32;
    let available = (size_f - start).floor() as u32;
    let length = ((extent * size_f).round().max(0.0) as u32)
        .min(available)
        .min(size - origin);
    (origin, length)
}

/// A crop box in absolute pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Extracts a sub-raster described by a [`CropRegion`].
#[derive(Clone)]
pub struct Cropper {
    decoder: ImageDecoder,
    quality: u8,
}

impl Cropper {
    pub fn new(compression: &CompressionConfig, limits: LimitsConfig) -> Self {
        Self {
            decoder: ImageDecoder::new(limits),
            quality: compression.quality,
        }
    }

    /// Crop on the blocking pool, bounded by the decode timeout.
    pub async fn crop(&self, bytes: Vec<u8>, region: CropRegion) -> PipelineResult<PreparedImage> {
        let this = self.clone();
        run_blocking("crop", self.decoder.timeout_ms(), move || {
            this.crop_sync(&bytes, region)
        })
        .await
    }

    /// Decode, extract the clamped region, and re-encode as JPEG.
    pub fn crop_sync(&self, bytes: &[u8], region: CropRegion) -> PipelineResult<PreparedImage> {
        let decoded = self.decoder.decode(bytes)?;
        let rect = region
            .to_pixels(decoded.width, decoded.height)
            .ok_or_else(|| {
                PipelineError::processing(
                    "crop",
                    format!(
                        "Region {region:?} is empty on a {}x{} image",
                        decoded.width, decoded.height
                    ),
                )
            })?;

        let cropped = decoded.image.crop_imm(rect.x, rect.y, rect.width, rect.height);
        let encoded = encode_jpeg(&cropped, self.quality)?;
        tracing::debug!(
            "Cropped {}x{} -> {}x{} at ({}, {})",
            decoded.width,
            decoded.height,
            rect.width,
            rect.height,
            rect.x,
            rect.y
        );

        Ok(PreparedImage {
            metadata: ImageMetadata::new(
                decoded.byte_size,
                encoded.len() as u64,
                rect.width,
                rect.height,
            ),
            bytes: encoded,
        })
    }
}
