//! Core data types shared across the try-on pipeline.
//!
//! These types cross the library boundary: the result contract handed back to
//! the session collaborator, the job descriptor, and the prepared image bytes
//! that flow between the local stages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::provider::ProviderStatus;

/// Which half of the try-on pair an image belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageSide {
    /// The customer photo (normalized only, never cropped)
    Customer,
    /// The garment photo (compressed and optionally cropped)
    Garment,
}

impl fmt::Display for ImageSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Customer => f.write_str("customer"),
            Self::Garment => f.write_str("garment"),
        }
    }
}

/// Size and dimension bookkeeping for a locally processed image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageMetadata {
    /// Input size in bytes
    pub original_size: u64,
    /// Output size in bytes
    pub processed_size: u64,
    /// `original_size / processed_size`
    pub compression_ratio: f64,
    /// Output width in pixels
    pub width: u32,
    /// Output height in pixels
    pub height: u32,
}

impl ImageMetadata {
    pub fn new(original_size: u64, processed_size: u64, width: u32, height: u32) -> Self {
        let compression_ratio = if processed_size == 0 {
            0.0
        } else {
            original_size as f64 / processed_size as f64
        };
        Self {
            original_size,
            processed_size,
            compression_ratio,
            width,
            height,
        }
    }
}

/// Encoded image bytes produced by a local stage, with their metadata.
#[derive(Debug, Clone)]
pub struct PreparedImage {
    /// Encoded (JPEG) bytes
    pub bytes: Vec<u8>,
    /// Sizes and output dimensions
    pub metadata: ImageMetadata,
}

/// A generation job accepted by the provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TryOnJob {
    /// Opaque provider-assigned identifier
    pub job_id: String,
    /// Absolute URL to poll for status
    pub status_url: String,
    /// When the job was submitted
    pub submitted_at: DateTime<Utc>,
    /// Last known status
    pub status: ProviderStatus,
}

/// Coarse fit judgment for a garment on the customer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitCategory {
    Perfect,
    Loose,
    Tight,
}

/// Structured fit judgment returned alongside a successful generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FitRecommendation {
    /// Fit category
    #[serde(alias = "fit")]
    pub fit_category: FitCategory,

    /// Confidence in [0, 1]
    pub confidence: f32,

    /// Suggested garment size (e.g. "M")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_size: Option<String>,

    /// Free-text explanation
    #[serde(default)]
    pub notes: String,
}

impl FitRecommendation {
    /// Clamp confidence into [0, 1]; non-finite values collapse to 0.
    pub fn clamped(mut self) -> Self {
        self.confidence = if self.confidence.is_finite() {
            self.confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self
    }
}

/// The outcome of one `generate` invocation.
///
/// A result is one of three shapes:
/// - success: `success = true`, `result_image_ref` usually set
/// - terminal failure: `success = false`, `error` set
/// - still processing: `success = false`, `requires_polling = true`,
///   `processing_status` holds the raw provider status
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TryOnResult {
    pub success: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_image_ref: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fit_recommendation: Option<FitRecommendation>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_status: Option<String>,

    #[serde(default)]
    pub requires_polling: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_url: Option<String>,
}

impl TryOnResult {
    /// A terminal failure carrying an error message.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }

    /// Whether the caller should poll again later.
    pub fn is_pending(&self) -> bool {
        !self.success && self.requires_polling
    }
}
