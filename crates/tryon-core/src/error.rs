//! Error types for the try-on pipeline.
//!
//! Errors are organized by stage so a failed invocation can say which side,
//! which stage, and which provider went wrong. Soft outcomes (a subject
//! detection miss, a polling budget running out) are not errors and never
//! appear here; they are carried by [`crate::types::TryOnResult`] instead.

use thiserror::Error;

use crate::types::ImageSide;

/// Top-level error type for try-on operations.
#[derive(Error, Debug)]
pub enum TryOnError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Pipeline processing errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// The session collaborator rejected an update
    #[error("Session {session_id}: {message}")]
    Session { session_id: String, message: String },

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Pipeline errors, organized by stage.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Image input is malformed (bad base64, empty, unsupported scheme)
    #[error("Invalid image input: {message}")]
    Input { message: String },

    /// A remote image could not be fetched
    #[error("Failed to fetch image {url}: {message}")]
    Fetch {
        url: String,
        message: String,
        status_code: Option<u16>,
    },

    /// Image payload exceeds the configured input limit
    #[error("Image input too large ({size_bytes} bytes > {max_bytes} bytes)")]
    InputTooLarge { size_bytes: u64, max_bytes: u64 },

    /// One side of the try-on pair could not be normalized
    #[error("Missing {side} image: {source}")]
    MissingInput {
        side: ImageSide,
        #[source]
        source: Box<PipelineError>,
    },

    /// Local raster decode/encode failed
    #[error("Image processing failed in {stage} stage: {message}")]
    Processing { stage: String, message: String },

    /// A bounded local stage ran out of time
    #[error("Timeout in {stage} stage after {timeout_ms}ms")]
    Timeout { stage: String, timeout_ms: u64 },

    /// The vision-inference provider call failed
    #[error("Vision error: {message}")]
    Vision {
        message: String,
        status_code: Option<u16>,
    },

    /// The generation provider call failed (transport or HTTP status)
    #[error("Provider error: {message}")]
    Provider {
        message: String,
        status_code: Option<u16>,
    },

    /// A provider response violated the expected shape
    #[error("Invalid {provider} response: {message}")]
    ProviderContract {
        provider: String,
        message: String,
        payload: String,
    },
}

impl PipelineError {
    /// Shorthand for a processing failure in a named stage.
    pub fn processing(stage: &str, message: impl Into<String>) -> Self {
        Self::Processing {
            stage: stage.to_string(),
            message: message.into(),
        }
    }

    /// Shorthand for a contract violation, keeping the raw payload for diagnosis.
    pub fn contract(provider: &str, message: impl Into<String>, payload: impl Into<String>) -> Self {
        Self::ProviderContract {
            provider: provider.to_string(),
            message: message.into(),
            payload: payload.into(),
        }
    }
}

/// Convenience type alias for try-on results.
pub type Result<T> = std::result::Result<T, TryOnError>;

/// Convenience type alias for pipeline-specific results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
