//! Vision provider trait and request/response types.
//!
//! Defines the interface that all vision backends implement, plus the
//! factory that creates the configured backend.

use async_trait::async_trait;
use base64::Engine;
use std::time::Duration;

use crate::config::{resolve_env_var, VisionConfig};
use crate::error::PipelineError;

/// Instruction sent with every subject-detection request.
pub const SUBJECT_PROMPT: &str = "Analyze this image and identify the main subject (person, object, or focal point). \
Provide the bounding box coordinates for cropping to focus on the main subject. \
Return only JSON in this format: {\"left\": number, \"top\": number, \"width\": number, \"height\": number} \
where coordinates are relative (0-1) to image dimensions.";

/// Base64-encoded image ready to send to a vision API.
#[derive(Debug, Clone)]
pub struct VisionImage {
    /// Base64-encoded image bytes
    pub data: String,
    /// MIME type (e.g., "image/jpeg")
    pub media_type: String,
}

impl VisionImage {
    /// Wrap JPEG bytes produced by the compressor.
    pub fn jpeg(bytes: &[u8]) -> Self {
        Self {
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
            media_type: "image/jpeg".to_string(),
        }
    }

    /// Return a data URL suitable for OpenAI-style APIs.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.data)
    }
}

/// A single vision-inference request.
#[derive(Debug, Clone)]
pub struct VisionRequest {
    /// The image to analyze
    pub image: VisionImage,
    /// Text prompt for the model
    pub prompt: String,
    /// Maximum tokens to generate
    pub max_tokens: u32,
}

impl VisionRequest {
    /// Build the fixed bounding-box request for a garment image.
    pub fn detect_subject(image: VisionImage) -> Self {
        Self {
            image,
            prompt: SUBJECT_PROMPT.to_string(),
            max_tokens: 200,
        }
    }
}

/// Raw text answer from a vision backend.
#[derive(Debug, Clone)]
pub struct VisionResponse {
    /// Generated text, trimmed
    pub text: String,
    /// Model identifier used
    pub model: String,
    /// Round-trip latency in milliseconds
    pub latency_ms: u64,
}

/// Trait that all vision backends implement.
///
/// Uses `async_trait` so the pipeline can hold a `Box<dyn VisionProvider>`.
#[async_trait]
pub trait VisionProvider: Send + Sync {
    /// Provider name for logging (e.g., "openai", "ollama").
    fn name(&self) -> &str;

    /// Run one inference request.
    async fn analyze(&self, request: &VisionRequest) -> Result<VisionResponse, PipelineError>;

    /// Per-request timeout for this provider.
    fn timeout(&self) -> Duration;
}

/// Factory that creates the configured vision backend.
pub struct VisionProviderFactory;

impl VisionProviderFactory {
    /// Create a vision provider from the `[vision]` config section.
    ///
    /// Fails when the provider name is unknown or its API key is not set.
    pub fn create(config: &VisionConfig) -> Result<Box<dyn VisionProvider>, PipelineError> {
        let timeout = Duration::from_millis(config.timeout_ms);
        match config.provider.as_str() {
            "openai" => {
                let cfg = config.openai.clone().unwrap_or_default();
                let api_key = resolve_env_var(&cfg.api_key).ok_or_else(|| PipelineError::Vision {
                    message: "OpenAI API key not set. Set OPENAI_API_KEY env var.".to_string(),
                    status_code: None,
                })?;
                Ok(Box::new(super::openai::OpenAiProvider::new(
                    &api_key, &cfg.model, timeout,
                )))
            }
            "anthropic" => {
                let cfg = config.anthropic.clone().unwrap_or_default();
                let api_key = resolve_env_var(&cfg.api_key).ok_or_else(|| PipelineError::Vision {
                    message: "Anthropic API key not set. Set ANTHROPIC_API_KEY env var."
                        .to_string(),
                    status_code: None,
                })?;
                Ok(Box::new(super::anthropic::AnthropicProvider::new(
                    &api_key, &cfg.model, timeout,
                )))
            }
            "ollama" => {
                let cfg = config.ollama.clone().unwrap_or_default();
                Ok(Box::new(super::ollama::OllamaProvider::new(
                    &cfg.endpoint,
                    &cfg.model,
                    timeout,
                )))
            }
            other => Err(PipelineError::Vision {
                message: format!("Unknown vision provider: {other}"),
                status_code: None,
            }),
        }
    }
}
