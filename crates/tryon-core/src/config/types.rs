//! Sub-configuration structs with their defaults.

use serde::{Deserialize, Serialize};

/// Generation provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Generation backend: "tryon-api" or "replicate"
    pub backend: String,

    /// Base URL of the try-on generation API
    pub base_url: String,

    /// API key (supports ${ENV_VAR} syntax)
    pub api_key: String,

    /// Ask the provider for its faster, lower-fidelity mode
    pub fast_mode: bool,

    /// Timeout for the create-job request in milliseconds
    pub submit_timeout_ms: u64,

    /// Replicate predictions settings, used when `backend = "replicate"`
    pub replicate: Option<ReplicateConfig>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            backend: "tryon-api".to_string(),
            base_url: "https://tryon-api.com".to_string(),
            api_key: "${TRYON_API_KEY}".to_string(),
            fast_mode: true,
            submit_timeout_ms: 60_000,
            replicate: None,
        }
    }
}

/// Replicate predictions API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplicateConfig {
    /// API root
    pub base_url: String,

    /// API token (supports ${ENV_VAR} syntax)
    pub api_token: String,

    /// Model version hash of the try-on model (supports ${ENV_VAR} syntax)
    pub model_version: String,
}

impl Default for ReplicateConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.replicate.com".to_string(),
            api_token: "${REPLICATE_API_TOKEN}".to_string(),
            model_version: "${TRYON_MODEL}".to_string(),
        }
    }
}

/// Status polling settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Total wall-clock budget for polling in milliseconds
    pub timeout_ms: u64,

    /// Initial delay between status requests
    pub interval_ms: u64,

    /// Upper bound for the delay between status requests
    pub max_interval_ms: u64,

    /// Multiplier applied to the delay after each non-terminal attempt
    pub backoff_factor: f64,

    /// Hard ceiling for a single status request
    pub attempt_timeout_cap_ms: u64,

    /// Added to the current interval to form the per-attempt timeout
    pub attempt_timeout_slack_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 120_000,
            interval_ms: 2000,
            max_interval_ms: 5000,
            backoff_factor: 1.5,
            attempt_timeout_cap_ms: 8000,
            attempt_timeout_slack_ms: 3000,
        }
    }
}

/// Garment compression settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompressionConfig {
    /// JPEG quality (1-100)
    pub quality: u8,

    /// Maximum output width in pixels
    pub max_width: u32,

    /// Maximum output height in pixels
    pub max_height: u32,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            quality: 80,
            max_width: 1920,
            max_height: 1080,
        }
    }
}

/// Resource limits to protect against problematic inputs.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum size of a single image input in bytes
    pub max_input_bytes: u64,

    /// Timeout for fetching a remote image in milliseconds
    pub fetch_timeout_ms: u64,

    /// Timeout for decode/encode work in milliseconds
    pub decode_timeout_ms: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_input_bytes: 10 * 1024 * 1024,
            fetch_timeout_ms: 30_000,
            decode_timeout_ms: 5000,
        }
    }
}

/// Demo/offline fallback settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    /// Bypass every network component and return a synthetic result
    pub enabled: bool,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// Subject-detection (vision) settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    /// Whether garment subject detection is attempted at all
    pub enabled: bool,

    /// Provider name: "openai", "anthropic" or "ollama"
    pub provider: String,

    /// Per-request timeout in milliseconds
    pub timeout_ms: u64,

    /// OpenAI configuration
    pub openai: Option<OpenAiConfig>,

    /// Anthropic configuration
    pub anthropic: Option<AnthropicConfig>,

    /// Ollama (local) configuration
    pub ollama: Option<OllamaConfig>,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            provider: "openai".to_string(),
            timeout_ms: 30_000,
            openai: None,
            anthropic: None,
            ollama: None,
        }
    }
}

/// OpenAI configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// API key (supports ${ENV_VAR} syntax)
    pub api_key: String,

    /// Model name
    pub model: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: "${OPENAI_API_KEY}".to_string(),
            model: "gpt-4o".to_string(),
        }
    }
}

/// Anthropic configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicConfig {
    /// API key (supports ${ENV_VAR} syntax)
    pub api_key: String,

    /// Model name
    pub model: String,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key: "${ANTHROPIC_API_KEY}".to_string(),
            model: "claude-sonnet-4-20250514".to_string(),
        }
    }
}

/// Ollama configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    /// Ollama API endpoint
    pub endpoint: String,

    /// Model name
    pub model: String,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:11434".to_string(),
            model: "llama3.2-vision".to_string(),
        }
    }
}
