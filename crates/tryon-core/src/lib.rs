//! Try-on Core - virtual try-on job orchestration.
//!
//! Takes a customer photo and a garment photo, prepares them, submits a
//! generation job to a hosted try-on provider (the try-on API or a Replicate
//! model), polls it under a time budget, and maps the outcome into a
//! [`TryOnResult`].
//!
//! # Architecture
//!
//! ```text
//! Normalize → Compress → Detect → Crop (garment only) → Submit → Poll → Map
//! ```
//!
//! Detection and cropping are optional and soft-fail to the compressed
//! garment. Every other stage is required and fails the invocation.
//!
//! # Usage
//!
//! ```rust,ignore
//! use tryon_core::{Config, GenerateOptions, ImageInput, TryOnPipeline};
//!
//! #[tokio::main]
//! async fn main() -> tryon_core::Result<()> {
//!     let config = Config::load()?;
//!     let pipeline = TryOnPipeline::new(&config)?;
//!
//!     let result = pipeline
//!         .generate(
//!             &ImageInput::from_reference("https://cdn.example.com/me.jpg"),
//!             &ImageInput::from_reference("https://cdn.example.com/shirt.jpg"),
//!             "Linen Shirt",
//!             &GenerateOptions::default(),
//!         )
//!         .await;
//!     println!("{}", serde_json::to_string_pretty(&result)?);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod mapper;
pub mod pipeline;
pub mod poll;
pub mod provider;
pub mod session;
pub mod types;
pub mod vision;

pub use config::Config;
pub use error::{ConfigError, PipelineError, PipelineResult, Result, TryOnError};
pub use mapper::ResultMapper;
pub use pipeline::{CropRegion, GarmentPreparer, GenerateOptions, ImageInput, SubjectDetector, TryOnPipeline};
pub use provider::{
    GenerationProvider, GenerationProviderFactory, ProviderStatus, ReplicateClient, StatusResponse,
    TryOnApiClient,
};
pub use session::{InMemorySessionStore, SessionStatus, SessionStore, SessionUpdate, TryOnSession};
pub use types::{FitCategory, FitRecommendation, ImageMetadata, ImageSide, PreparedImage, TryOnJob, TryOnResult};
pub use vision::{VisionProvider, VisionProviderFactory};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
