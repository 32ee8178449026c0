//! Translation from provider status payloads to [`TryOnResult`].

use crate::error::PipelineError;
use crate::pipeline::ImageInput;
use crate::provider::{ProviderStatus, StatusResponse};
use crate::types::{FitCategory, FitRecommendation, TryOnJob, TryOnResult};

const GENERIC_FAILURE: &str = "Try-on generation failed";

/// Maps provider answers and pipeline errors into the result contract.
pub struct ResultMapper;

impl ResultMapper {
    /// Map a status payload, filling job identity from `job` when the payload lacks it.
    pub fn map(response: &StatusResponse, job: Option<&TryOnJob>) -> TryOnResult {
        let job_id = response
            .job_id
            .clone()
            .or_else(|| job.map(|j| j.job_id.clone()));

        match &response.status {
            ProviderStatus::Completed => TryOnResult {
                success: true,
                result_image_ref: Self::image_ref(response),
                fit_recommendation: Some(Self::fit(response)),
                job_id,
                ..Default::default()
            },
            ProviderStatus::Failed => TryOnResult {
                job_id,
                ..TryOnResult::failure(
                    response
                        .error
                        .as_deref()
                        .or(response.message.as_deref())
                        .filter(|m| !m.is_empty())
                        .unwrap_or(GENERIC_FAILURE),
                )
            },
            // In progress, timed out, or a status we do not know: try later
            other => TryOnResult {
                success: false,
                processing_status: Some(other.as_str().to_string()),
                requires_polling: true,
                job_id,
                status_url: job.map(|j| j.status_url.clone()),
                ..Default::default()
            },
        }
    }

    /// A pending result for a freshly accepted job.
    pub fn pending(job: &TryOnJob) -> TryOnResult {
        TryOnResult {
            success: false,
            processing_status: Some(job.status.as_str().to_string()),
            requires_polling: true,
            job_id: Some(job.job_id.clone()),
            status_url: Some(job.status_url.clone()),
            ..Default::default()
        }
    }

    /// A failed result for a fatal pipeline error.
    pub fn from_error(error: &PipelineError) -> TryOnResult {
        TryOnResult::failure(error.to_string())
    }

    /// Deterministic synthetic success that echoes the customer image.
    pub fn demo(customer: &ImageInput, product_label: &str) -> TryOnResult {
        TryOnResult {
            success: true,
            result_image_ref: Some(customer.as_reference()),
            fit_recommendation: Some(FitRecommendation {
                fit_category: FitCategory::Perfect,
                confidence: 0.75,
                suggested_size: Some("M".to_string()),
                notes: format!("Demo mode: estimated fit for {product_label}."),
            }),
            ..Default::default()
        }
    }

    fn image_ref(response: &StatusResponse) -> Option<String> {
        if let Some(url) = response.image_url.as_ref().filter(|u| !u.is_empty()) {
            return Some(url.clone());
        }
        let b64 = response.image_base64.as_ref().filter(|b| !b.is_empty())?;
        if b64.starts_with("data:") {
            Some(b64.clone())
        } else {
            Some(format!("data:image/jpeg;base64,{b64}"))
        }
    }

    fn fit(response: &StatusResponse) -> FitRecommendation {
        let supplied = response.fit_recommendation.as_ref().and_then(|value| {
            serde_json::from_value::<FitRecommendation>(value.clone())
                .map_err(|e| tracing::debug!("Ignoring provider fit data: {e}"))
                .ok()
        });
        supplied.map(FitRecommendation::clamped).unwrap_or_else(|| FitRecommendation {
            fit_category: FitCategory::Perfect,
            confidence: 0.9,
            suggested_size: None,
            notes: "AI-generated virtual try-on completed successfully".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn job() -> TryOnJob {
        TryOnJob {
            job_id: "job_9".to_string(),
            status_url: "https://tryon-api.com/api/v1/tryon/status/job_9".to_string(),
            submitted_at: Utc::now(),
            status: ProviderStatus::Queued,
        }
    }

    #[test]
    fn test_completed_with_default_fit() {
        let response = StatusResponse {
            image_url: Some("X".to_string()),
            ..StatusResponse::with_status(ProviderStatus::Completed)
        };
        let result = ResultMapper::map(&response, Some(&job()));

        assert!(result.success);
        assert_eq!(result.result_image_ref.as_deref(), Some("X"));
        let fit = result.fit_recommendation.unwrap();
        assert_eq!(fit.fit_category, FitCategory::Perfect);
        assert_eq!(fit.confidence, 0.9);
        assert_eq!(result.job_id.as_deref(), Some("job_9"));
        assert!(!result.requires_polling);
    }

    #[test]
    fn test_completed_without_image_is_still_success() {
        let result = ResultMapper::map(&StatusResponse::with_status(ProviderStatus::Completed), None);
        assert!(result.success);
        assert!(result.result_image_ref.is_none());
    }

    #[test]
    fn test_completed_base64_becomes_data_uri() {
        let response = StatusResponse {
            image_base64: Some("QUJD".to_string()),
            ..StatusResponse::with_status(ProviderStatus::Completed)
        };
        let result = ResultMapper::map(&response, None);
        assert_eq!(result.result_image_ref.as_deref(), Some("data:image/jpeg;base64,QUJD"));
    }

    #[test]
    fn test_provider_fit_overrides_default() {
        let response = StatusResponse {
            fit_recommendation: Some(serde_json::json!({
                "fitCategory": "tight",
                "confidence": 1.4,
                "suggestedSize": "L",
                "notes": "size up"
            })),
            ..StatusResponse::with_status(ProviderStatus::Completed)
        };
        let fit = ResultMapper::map(&response, None).fit_recommendation.unwrap();
        assert_eq!(fit.fit_category, FitCategory::Tight);
        assert_eq!(fit.confidence, 1.0);
        assert_eq!(fit.suggested_size.as_deref(), Some("L"));
    }

    #[test]
    fn test_failed_message_precedence() {
        let both = StatusResponse {
            error: Some("garment not detected".to_string()),
            message: Some("job failed".to_string()),
            ..StatusResponse::with_status(ProviderStatus::Failed)
        };
        assert_eq!(
            ResultMapper::map(&both, None).error.as_deref(),
            Some("garment not detected")
        );

        let message_only = StatusResponse {
            message: Some("job failed".to_string()),
            ..StatusResponse::with_status(ProviderStatus::Failed)
        };
        assert_eq!(ResultMapper::map(&message_only, None).error.as_deref(), Some("job failed"));

        let bare = ResultMapper::map(&StatusResponse::with_status(ProviderStatus::Failed), None);
        assert!(!bare.success);
        assert_eq!(bare.error.as_deref(), Some(GENERIC_FAILURE));
    }

    #[test]
    fn test_non_terminal_requires_polling() {
        for status in [
            ProviderStatus::Queued,
            ProviderStatus::Processing,
            ProviderStatus::ProcessingFromQueue,
            ProviderStatus::Timeout,
            ProviderStatus::Unknown("paused".to_string()),
        ] {
            let raw = status.as_str().to_string();
            let result = ResultMapper::map(&StatusResponse::with_status(status), Some(&job()));
            assert!(!result.success);
            assert!(result.requires_polling);
            assert!(result.error.is_none());
            assert_eq!(result.processing_status.as_deref(), Some(raw.as_str()));
            assert!(result.status_url.is_some());
        }
    }

    #[test]
    fn test_demo_echoes_customer_image() {
        let customer = ImageInput::Url("https://cdn.example.com/me.jpg".to_string());
        let result = ResultMapper::demo(&customer, "Linen Shirt");
        assert!(result.success);
        assert_eq!(result.result_image_ref.as_deref(), Some("https://cdn.example.com/me.jpg"));
        let fit = result.fit_recommendation.unwrap();
        assert_eq!(fit.confidence, 0.75);
        assert_eq!(fit.notes, "Demo mode: estimated fit for Linen Shirt.");
    }
}
