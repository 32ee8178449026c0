//! Scripted generation provider for tests.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::{PipelineError, PipelineResult};

use super::client::{CreateJobRequest, GenerationProvider, SubmitResponse};
use super::status::{ProviderStatus, StatusResponse};

/// One scripted answer to a status request.
#[derive(Debug, Clone)]
pub(crate) enum Step {
    Status(StatusResponse),
    /// Transport failure
    Fail,
}

impl Step {
    pub(crate) fn status(raw: &str) -> Self {
        Self::Status(StatusResponse::with_status(ProviderStatus::parse(raw)))
    }

    pub(crate) fn completed(image_url: &str) -> Self {
        Self::Status(StatusResponse {
            image_url: Some(image_url.to_string()),
            ..StatusResponse::with_status(ProviderStatus::Completed)
        })
    }
}

pub(crate) struct MockGeneration {
    submit: Option<SubmitResponse>,
    steps: Mutex<VecDeque<Step>>,
    latency: Duration,
    pub create_calls: AtomicU32,
    pub status_calls: AtomicU32,
    pub last_request: Mutex<Option<CreateJobRequest>>,
}

impl MockGeneration {
    /// Accepts jobs at `status_url` and replays `steps`; the last step repeats.
    pub(crate) fn accepting(status_url: &str, steps: Vec<Step>) -> Arc<Self> {
        Arc::new(Self::build(
            Some(SubmitResponse::Accepted {
                job_id: "job_test".to_string(),
                status_url: status_url.to_string(),
            }),
            steps,
            Duration::ZERO,
        ))
    }

    /// Rejects every create-job call with a contract error.
    pub(crate) fn rejecting() -> Arc<Self> {
        Arc::new(Self::build(None, Vec::new(), Duration::ZERO))
    }

    /// Status requests take `latency` of (virtual) time.
    pub(crate) fn with_latency(status_url: &str, steps: Vec<Step>, latency: Duration) -> Arc<Self> {
        Arc::new(Self::build(
            Some(SubmitResponse::Accepted {
                job_id: "job_test".to_string(),
                status_url: status_url.to_string(),
            }),
            steps,
            latency,
        ))
    }

    fn build(submit: Option<SubmitResponse>, steps: Vec<Step>, latency: Duration) -> Self {
        Self {
            submit,
            steps: Mutex::new(steps.into()),
            latency,
            create_calls: AtomicU32::new(0),
            status_calls: AtomicU32::new(0),
            last_request: Mutex::new(None),
        }
    }

    pub(crate) fn total_calls(&self) -> u32 {
        self.create_calls.load(Ordering::SeqCst) + self.status_calls.load(Ordering::SeqCst)
    }

    fn next_step(&self) -> Option<Step> {
        let mut steps = self.steps.lock().unwrap();
        if steps.len() > 1 {
            steps.pop_front()
        } else {
            steps.front().cloned()
        }
    }
}

#[async_trait]
impl GenerationProvider for MockGeneration {
    fn name(&self) -> &str {
        "mock"
    }

    async fn create_job(&self, request: CreateJobRequest) -> PipelineResult<SubmitResponse> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_request.lock().unwrap() = Some(request);
        self.submit
            .clone()
            .ok_or_else(|| PipelineError::contract("mock", "missing jobId or statusUrl", "{}"))
    }

    async fn fetch_status(&self, _status_url: &str, timeout: Duration) -> PipelineResult<StatusResponse> {
        self.status_calls.fetch_add(1, Ordering::SeqCst);
        if self.latency > timeout {
            tokio::time::sleep(timeout).await;
            return Err(PipelineError::Provider {
                message: "Status request failed: operation timed out".to_string(),
                status_code: None,
            });
        }
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        match self.next_step() {
            Some(Step::Status(status)) if status.status.is_known() => Ok(status),
            Some(Step::Status(status)) => Err(PipelineError::contract(
                "status",
                format!("unknown status '{}'", status.status),
                "{}",
            )),
            Some(Step::Fail) | None => Err(PipelineError::Provider {
                message: "Status request failed: connection reset".to_string(),
                status_code: None,
            }),
        }
    }
}
