//! Provider status vocabulary and the status payload.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::error::{PipelineError, PipelineResult};

/// Job status as reported by the generation provider.
///
/// Six statuses are recognized. Anything else is kept verbatim in
/// [`ProviderStatus::Unknown`] so callers can decide how strict to be.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProviderStatus {
    Completed,
    Failed,
    Processing,
    Queued,
    ProcessingFromQueue,
    Timeout,
    Unknown(String),
}

impl ProviderStatus {
    /// Parse a raw status string. Matching is exact.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            "processing" => Self::Processing,
            "queued" => Self::Queued,
            "processing_from_queue" => Self::ProcessingFromQueue,
            "timeout" => Self::Timeout,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Processing => "processing",
            Self::Queued => "queued",
            Self::ProcessingFromQueue => "processing_from_queue",
            Self::Timeout => "timeout",
            Self::Unknown(raw) => raw,
        }
    }

    /// The job is still moving through the provider's queue.
    pub fn is_in_progress(&self) -> bool {
        matches!(
            self,
            Self::Processing | Self::Queued | Self::ProcessingFromQueue
        )
    }

    /// A recognized status that ends polling.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Timeout)
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown(_))
    }
}

impl fmt::Display for ProviderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for ProviderStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for ProviderStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

/// Body of a "get status" response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub status: ProviderStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_base64: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,

    /// Provider-supplied fit data, validated by the mapper
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fit_recommendation: Option<serde_json::Value>,
}

impl StatusResponse {
    /// A bare response carrying only a status.
    pub fn with_status(status: ProviderStatus) -> Self {
        Self {
            status,
            image_url: None,
            image_base64: None,
            provider: None,
            job_id: None,
            error: None,
            message: None,
            error_code: None,
            fit_recommendation: None,
        }
    }

    /// The placeholder returned when polling ran out of budget with no answer.
    pub fn synthetic_timeout() -> Self {
        Self {
            message: Some("Timed out waiting for result".to_string()),
            ..Self::with_status(ProviderStatus::Timeout)
        }
    }

    /// Parse and validate a status body.
    ///
    /// A missing `status` field or an unrecognized status value is a
    /// contract violation.
    pub fn parse(body: &str) -> PipelineResult<Self> {
        let response: StatusResponse = serde_json::from_str(body)
            .map_err(|e| PipelineError::contract("status", e.to_string(), body))?;
        if let ProviderStatus::Unknown(raw) = &response.status {
            return Err(PipelineError::contract(
                "status",
                format!("unknown status '{raw}'"),
                body,
            ));
        }
        Ok(response)
    }
}
