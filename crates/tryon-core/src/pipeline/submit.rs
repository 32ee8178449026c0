//! Job submission: normalize both sides, prepare the garment, create the job.

use chrono::Utc;
use std::sync::Arc;

use crate::error::{PipelineError, PipelineResult};
use crate::provider::{CreateJobRequest, GenerationProvider, ProviderStatus, StatusResponse, SubmitResponse};
use crate::types::{ImageSide, TryOnJob};

use super::input::{decode_canonical, ImageInput, Normalizer};
use super::prepare::{GarmentPreparer, PreparedGarment};

/// What a submission produced.
#[derive(Debug, Clone)]
pub enum Submission {
    /// The provider answered synchronously
    Inline(StatusResponse),
    /// An asynchronous job to poll
    Job(TryOnJob),
}

/// Packages both images and creates a generation job.
pub struct JobSubmitter {
    normalizer: Normalizer,
    preparer: GarmentPreparer,
    provider: Arc<dyn GenerationProvider>,
}

impl JobSubmitter {
    pub fn new(
        normalizer: Normalizer,
        preparer: GarmentPreparer,
        provider: Arc<dyn GenerationProvider>,
    ) -> Self {
        Self {
            normalizer,
            preparer,
            provider,
        }
    }

    pub async fn submit(
        &self,
        customer: &ImageInput,
        garment: &ImageInput,
        skip_crop: bool,
    ) -> PipelineResult<Submission> {
        let person = self.load(ImageSide::Customer, customer).await?;
        let garment_bytes = self.load(ImageSide::Garment, garment).await?;
        let PreparedGarment { image, region } = self.preparer.prepare(garment_bytes, skip_crop).await?;

        tracing::info!(
            "Submitting try-on job to {} (garment {}x{}, {} bytes{})",
            self.provider.name(),
            image.metadata.width,
            image.metadata.height,
            image.metadata.processed_size,
            if region.is_some() { ", cropped" } else { "" }
        );

        let response = self
            .provider
            .create_job(CreateJobRequest {
                person,
                garment: image.bytes,
            })
            .await?;

        Ok(match response {
            SubmitResponse::Inline(status) => Submission::Inline(status),
            SubmitResponse::Accepted { job_id, status_url } => {
                tracing::info!("Job {job_id} accepted, status at {status_url}");
                Submission::Job(TryOnJob {
                    job_id,
                    status_url,
                    submitted_at: Utc::now(),
                    status: ProviderStatus::Queued,
                })
            }
        })
    }

    /// Normalize one side to raw bytes, tagging any failure with the side.
    async fn load(&self, side: ImageSide, input: &ImageInput) -> PipelineResult<Vec<u8>> {
        let tag = |source: PipelineError| PipelineError::MissingInput {
            side,
            source: Box::new(source),
        };
        tracing::debug!("Normalizing {side} image from {}", input.describe());
        let canonical = self.normalizer.normalize(input).await.map_err(tag)?;
        decode_canonical(&canonical).map_err(tag)
    }
}
