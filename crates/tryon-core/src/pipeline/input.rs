//! Image inputs and their normalization to canonical base64.
//!
//! Every stage after this one works on a single representation: standard
//! base64 with no `data:` prefix. Remote URLs are fetched, data URIs are
//! stripped, raw bytes are encoded, and canonical strings pass through.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use futures_util::StreamExt;
use std::time::Duration;

use crate::config::LimitsConfig;
use crate::error::{PipelineError, PipelineResult};

/// Data-URI media types the normalizer strips.
const DATA_URI_TYPES: [&str; 4] = ["png", "jpg", "jpeg", "webp"];

/// One image as handed to the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageInput {
    /// `http://` or `https://` reference, fetched on normalization
    Url(String),
    /// `data:image/<type>;base64,<payload>`
    DataUri(String),
    /// Already-canonical base64 with no prefix
    Base64(String),
    /// Raw encoded image bytes (JPEG, PNG, ...)
    Bytes(Vec<u8>),
}

impl ImageInput {
    /// Classify a string reference by its scheme.
    pub fn from_reference(value: &str) -> Self {
        let trimmed = value.trim();
        let lower = trimmed.get(..8).unwrap_or(trimmed).to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Self::Url(trimmed.to_string())
        } else if lower.starts_with("data:") {
            Self::DataUri(trimmed.to_string())
        } else {
            Self::Base64(trimmed.to_string())
        }
    }

    /// A displayable reference for this input without touching the network.
    ///
    /// URLs and data URIs are returned as-is; base64 and raw bytes become a
    /// JPEG data URI.
    pub fn as_reference(&self) -> String {
        match self {
            Self::Url(url) => url.clone(),
            Self::DataUri(uri) => uri.clone(),
            Self::Base64(b64) => format!("data:image/jpeg;base64,{b64}"),
            Self::Bytes(bytes) => format!("data:image/jpeg;base64,{}", BASE64.encode(bytes)),
        }
    }

    /// Short description for logs (never the payload itself).
    pub fn describe(&self) -> String {
        match self {
            Self::Url(url) => format!("url {url}"),
            Self::DataUri(uri) => format!("data uri ({} chars)", uri.len()),
            Self::Base64(b64) => format!("base64 ({} chars)", b64.len()),
            Self::Bytes(bytes) => format!("bytes ({} bytes)", bytes.len()),
        }
    }
}

impl From<Vec<u8>> for ImageInput {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<&str> for ImageInput {
    fn from(value: &str) -> Self {
        Self::from_reference(value)
    }
}

/// Strip a `data:image/(png|jpg|jpeg|webp);base64,` prefix.
///
/// Returns `None` when the string is not a data URI of a supported type.
pub fn strip_data_uri_prefix(value: &str) -> Option<&str> {
    let comma = value.find(',')?;
    let (header, payload) = (&value[..comma], &value[comma + 1..]);
    let header = header.to_ascii_lowercase();
    let media = header.strip_prefix("data:image/")?.strip_suffix(";base64")?;
    if DATA_URI_TYPES.contains(&media) && !payload.is_empty() {
        Some(payload)
    } else {
        None
    }
}

/// Decode canonical base64 into raw bytes.
pub fn decode_canonical(b64: &str) -> PipelineResult<Vec<u8>> {
    BASE64.decode(b64.trim()).map_err(|e| PipelineError::Input {
        message: format!("Image payload is not valid base64: {e}"),
    })
}

/// Converts any [`ImageInput`] to canonical base64.
pub struct Normalizer {
    client: reqwest::Client,
    limits: LimitsConfig,
}

impl Normalizer {
    pub fn new(limits: LimitsConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            limits,
        }
    }

    /// Normalize an input to canonical base64. Idempotent on canonical strings.
    pub async fn normalize(&self, input: &ImageInput) -> PipelineResult<String> {
        match input {
            ImageInput::Url(url) => {
                let bytes = self.fetch(url).await?;
                Ok(BASE64.encode(bytes))
            }
            ImageInput::DataUri(uri) => strip_data_uri_prefix(uri)
                .map(str::to_string)
                .ok_or_else(|| PipelineError::Input {
                    message: "Unsupported data URI (expected image/png, jpg, jpeg or webp with base64)"
                        .to_string(),
                }),
            ImageInput::Base64(b64) => {
                if b64.is_empty() {
                    return Err(PipelineError::Input {
                        message: "Empty image payload".to_string(),
                    });
                }
                Ok(b64.clone())
            }
            ImageInput::Bytes(bytes) => {
                self.check_size(bytes.len() as u64)?;
                if bytes.is_empty() {
                    return Err(PipelineError::Input {
                        message: "Empty image payload".to_string(),
                    });
                }
                Ok(BASE64.encode(bytes))
            }
        }
    }

    /// Fetch a remote image, enforcing status, timeout, and size limits.
    async fn fetch(&self, url: &str) -> PipelineResult<Vec<u8>> {
        let fetch_err = |message: String, status_code: Option<u16>| PipelineError::Fetch {
            url: url.to_string(),
            message,
            status_code,
        };

        tracing::debug!("Fetching image: {url}");
        let response = self
            .client
            .get(url)
            .timeout(Duration::from_millis(self.limits.fetch_timeout_ms))
            .send()
            .await
            .map_err(|e| fetch_err(format!("request failed: {e}"), None))?;

        let status = response.status();
        if !status.is_success() {
            return Err(fetch_err(format!("HTTP {status}"), Some(status.as_u16())));
        }

        if let Some(len) = response.content_length() {
            self.check_size(len)?;
        }

        let mut stream = response.bytes_stream();
        let mut bytes = Vec::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| fetch_err(format!("body read failed: {e}"), None))?;
            bytes.extend_from_slice(&chunk);
            self.check_size(bytes.len() as u64)?;
        }

        if bytes.is_empty() {
            return Err(fetch_err("empty response body".to_string(), None));
        }
        Ok(bytes)
    }

    fn check_size(&self, size_bytes: u64) -> PipelineResult<()> {
        if size_bytes > self.limits.max_input_bytes {
            return Err(PipelineError::InputTooLarge {
                size_bytes,
                max_bytes: self.limits.max_input_bytes,
            });
        }
        Ok(())
    }
}
