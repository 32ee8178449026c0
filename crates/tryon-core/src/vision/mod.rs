//! Vision inference for garment subject detection.
//!
//! Provides a provider abstraction over the vision backends (OpenAI,
//! Anthropic, Ollama). The detector in [`crate::pipeline`] makes exactly one
//! call per crop attempt and treats every failure here as a soft miss.

pub(crate) mod anthropic;
pub(crate) mod ollama;
pub(crate) mod openai;
pub(crate) mod provider;

pub use provider::{VisionImage, VisionProvider, VisionProviderFactory, VisionRequest, VisionResponse};
