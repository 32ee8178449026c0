//! Garment subject detection through a vision backend.
//!
//! Detection is optional: every failure mode (disabled feature, transport
//! error, timeout, malformed answer) is logged and collapses to `None`.

use std::sync::Arc;

use crate::vision::{VisionImage, VisionProvider, VisionRequest};

use super::crop::CropRegion;

/// Asks a vision backend where the garment is.
#[derive(Clone)]
pub struct SubjectDetector {
    provider: Option<Arc<dyn VisionProvider>>,
}

impl SubjectDetector {
    pub fn new(provider: Arc<dyn VisionProvider>) -> Self {
        Self {
            provider: Some(provider),
        }
    }

    /// A detector that never finds anything.
    pub fn disabled() -> Self {
        Self { provider: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.provider.is_some()
    }

    /// One vision call on the compressed garment bytes. Never fails.
    pub async fn detect(&self, jpeg: &[u8]) -> Option<CropRegion> {
        let provider = self.provider.as_ref()?;
        let request = VisionRequest::detect_subject(VisionImage::jpeg(jpeg));

        let response =
            match tokio::time::timeout(provider.timeout(), provider.analyze(&request)).await {
                Ok(Ok(response)) => response,
                Ok(Err(e)) => {
                    tracing::warn!("Subject detection via {} failed: {e}", provider.name());
                    return None;
                }
                Err(_) => {
                    tracing::warn!(
                        "Subject detection via {} timed out after {:?}",
                        provider.name(),
                        provider.timeout()
                    );
                    return None;
                }
            };

        match parse_crop_region(&response.text) {
            Ok(region) => {
                tracing::debug!(
                    "Detected subject {region:?} via {} in {}ms",
                    response.model,
                    response.latency_ms
                );
                Some(region)
            }
            Err(reason) => {
                tracing::warn!("Ignoring vision answer ({reason}): {}", response.text);
                None
            }
        }
    }
}

/// Parse a model answer into a clamped [`CropRegion`].
///
/// The answer must be a JSON object with four numeric fields. A surrounding
/// markdown code fence is tolerated; prose is not.
pub fn parse_crop_region(text: &str) -> Result<CropRegion, String> {
    let body = strip_code_fence(text.trim());
    let region: CropRegion = serde_json::from_str(body).map_err(|e| e.to_string())?;
    if !region.is_finite() {
        return Err("non-finite coordinate".to_string());
    }
    Ok(region.clamped())
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string ("json") on the opening fence line
    let rest = rest.split_once('\n').map_or("", |(_, body)| body);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}
