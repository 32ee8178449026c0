//! Generation provider boundary.
//!
//! The status vocabulary, the provider trait the pipeline talks to, and the
//! HTTP clients for the hosted try-on API and Replicate predictions.

pub(crate) mod client;
#[cfg(test)]
pub(crate) mod mock;
pub(crate) mod replicate;
pub(crate) mod status;

pub use client::{
    resolve_status_url, CreateJobRequest, GenerationProvider, GenerationProviderFactory, SubmitResponse,
    TryOnApiClient,
};
pub use replicate::{prediction_status, ReplicateClient};
pub use status::{ProviderStatus, StatusResponse};
