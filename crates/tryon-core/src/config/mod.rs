//! Configuration management for the try-on pipeline.
//!
//! Configuration is loaded from the platform config directory with sensible
//! defaults, then overridden by the `TRYON_*` environment variables the
//! deployment sets. All config structs implement `Default`.

mod types;
mod validate;

pub use types::*;

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Environment variables consulted by [`Config::apply_overrides`].
pub const OVERRIDE_KEYS: [&str; 5] = [
    "TRYON_PROVIDER",
    "TRYON_API_BASE_URL",
    "TRYON_API_KEY",
    "TRYON_POLL_TIMEOUT_MS",
    "DEMO_TRYON_FALLBACK",
];

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Generation provider settings
    pub provider: ProviderConfig,

    /// Status polling settings
    pub polling: PollingConfig,

    /// Garment compression settings
    pub compression: CompressionConfig,

    /// Subject detection settings
    pub vision: VisionConfig,

    /// Resource limits
    pub limits: LimitsConfig,

    /// Demo/offline fallback
    pub demo: DemoConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from the default location, then apply environment overrides.
    ///
    /// Returns default configuration if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        let mut config = if path.exists() {
            Self::load_from(&path)?
        } else {
            Self::default()
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path.
    ///
    /// Uses platform-appropriate directories:
    /// - macOS: ~/Library/Application Support/com.tryon.tryon/config.toml
    /// - Linux: ~/.config/tryon/config.toml
    /// - Windows: C:\Users\<User>\AppData\Roaming\tryon\config\config.toml
    ///
    /// Falls back to ~/.tryon/config.toml if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "tryon", "tryon")
            .map(|dirs| dirs.config_dir().to_path_buf().join("config.toml"))
            .unwrap_or_else(|| {
                let expanded = shellexpand::tilde("~/.tryon/config.toml");
                PathBuf::from(expanded.into_owned())
            })
    }

    /// Apply deployment overrides from a key lookup (normally the process environment).
    ///
    /// Recognized keys: `TRYON_PROVIDER`, `TRYON_API_BASE_URL`, `TRYON_API_KEY`,
    /// `TRYON_POLL_TIMEOUT_MS`, `DEMO_TRYON_FALLBACK`.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(backend) = lookup("TRYON_PROVIDER").filter(|v| !v.trim().is_empty()) {
            self.provider.backend = backend.trim().to_ascii_lowercase();
        }
        if let Some(url) = lookup("TRYON_API_BASE_URL").filter(|v| !v.is_empty()) {
            self.provider.base_url = url;
        }
        if let Some(key) = lookup("TRYON_API_KEY").filter(|v| !v.is_empty()) {
            self.provider.api_key = key;
        }
        if let Some(raw) = lookup("TRYON_POLL_TIMEOUT_MS") {
            match raw.trim().parse::<u64>() {
                Ok(ms) => self.polling.timeout_ms = ms,
                Err(_) => tracing::warn!("Ignoring non-numeric TRYON_POLL_TIMEOUT_MS={raw:?}"),
            }
        }
        if let Some(flag) = lookup("DEMO_TRYON_FALLBACK") {
            self.demo.enabled = flag.trim().eq_ignore_ascii_case("true");
        }
    }

    /// Resolved credential for the selected generation backend, if one is configured.
    pub fn provider_api_key(&self) -> Option<String> {
        match self.provider.backend.as_str() {
            "replicate" => {
                let replicate = self.provider.replicate.clone().unwrap_or_default();
                resolve_env_var(&replicate.api_token)
            }
            _ => resolve_env_var(&self.provider.api_key),
        }
    }

    /// Whether the demo/offline fallback replaces the live pipeline.
    ///
    /// Active when the flag is set or no provider credentials are available.
    pub fn demo_mode(&self) -> bool {
        self.demo.enabled || self.provider_api_key().is_none()
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}

/// Resolve `${ENV_VAR}` references in config strings.
pub fn resolve_env_var(value: &str) -> Option<String> {
    if value.starts_with("${") && value.ends_with('}') {
        let var_name = &value[2..value.len() - 1];
        std::env::var(var_name).ok().filter(|v| !v.is_empty())
    } else if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
