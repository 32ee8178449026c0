//! Replicate predictions backend.
//!
//! A try-on model hosted on Replicate runs as a prediction: `POST
//! /v1/predictions` creates it, `urls.get` reports its progress. Prediction
//! statuses are translated onto [`ProviderStatus`] so the poller and mapper
//! treat both backends alike.

use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

use crate::config::{resolve_env_var, ProviderConfig};
use crate::error::{PipelineError, PipelineResult};

use super::client::{
    resolve_status_url, settled_inline, submit_error, CreateJobRequest, GenerationProvider,
    SubmitResponse,
};
use super::status::{ProviderStatus, StatusResponse};

const PROVIDER_NAME: &str = "replicate";

/// Client for the Replicate predictions API.
pub struct ReplicateClient {
    client: reqwest::Client,
    base_url: String,
    api_token: String,
    model_version: String,
    submit_timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct Prediction {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    urls: Option<PredictionUrls>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    output: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct PredictionUrls {
    #[serde(default)]
    get: Option<String>,
}

/// Translate a prediction status onto the shared vocabulary.
pub fn prediction_status(raw: &str) -> ProviderStatus {
    match raw {
        "starting" | "queued" => ProviderStatus::Queued,
        "processing" => ProviderStatus::Processing,
        "succeeded" => ProviderStatus::Completed,
        "failed" | "canceled" | "aborted" => ProviderStatus::Failed,
        other => ProviderStatus::Unknown(other.to_string()),
    }
}

impl Prediction {
    fn poll_url(&self) -> Option<&str> {
        self.urls
            .as_ref()
            .and_then(|urls| urls.get.as_deref())
            .or(self.url.as_deref())
            .filter(|url| !url.is_empty())
    }

    /// The result image: a single URL, or the last URL of a list.
    fn output_url(&self) -> Option<String> {
        match self.output.as_ref()? {
            Value::String(url) => Some(url.clone()),
            Value::Array(items) => items.iter().rev().find_map(|v| v.as_str()).map(str::to_string),
            _ => None,
        }
    }

    fn error_message(&self) -> Option<String> {
        match self.error.as_ref()? {
            Value::Null => None,
            Value::String(message) => Some(message.clone()),
            other => Some(other.to_string()),
        }
    }

    fn to_status(&self, raw_status: &str) -> StatusResponse {
        let status = prediction_status(raw_status);
        let mut response = StatusResponse {
            provider: Some(PROVIDER_NAME.to_string()),
            job_id: self.id.clone(),
            ..StatusResponse::with_status(status.clone())
        };
        match status {
            ProviderStatus::Completed => response.image_url = self.output_url(),
            ProviderStatus::Failed => {
                response.error = Some(self.error_message().unwrap_or_else(|| {
                    if raw_status == "failed" {
                        "Replicate prediction failed".to_string()
                    } else {
                        format!("Replicate prediction {raw_status}")
                    }
                }))
            }
            _ => {}
        }
        response
    }
}

impl ReplicateClient {
    pub fn new(base_url: &str, api_token: &str, model_version: &str, submit_timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_token: api_token.to_string(),
            model_version: model_version.to_string(),
            submit_timeout,
        }
    }

    /// Build from `[provider]` and its `[provider.replicate]` table.
    pub fn from_config(config: &ProviderConfig) -> PipelineResult<Self> {
        let replicate = config.replicate.clone().unwrap_or_default();
        let missing = |what: &str, var: &str| PipelineError::Provider {
            message: format!("Replicate {what} not set. Set {var} env var."),
            status_code: None,
        };
        let api_token = resolve_env_var(&replicate.api_token)
            .ok_or_else(|| missing("API token", "REPLICATE_API_TOKEN"))?;
        let model_version = resolve_env_var(&replicate.model_version)
            .ok_or_else(|| missing("model version", "TRYON_MODEL"))?;
        Ok(Self::new(
            &replicate.base_url,
            &api_token,
            &model_version,
            Duration::from_millis(config.submit_timeout_ms),
        ))
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder.header("Authorization", format!("Token {}", self.api_token))
    }

    /// Build the prediction input. Popular try-on models disagree on field
    /// names, so both naming schemes are sent.
    fn input(request: &CreateJobRequest) -> Value {
        let person = data_uri(&request.person);
        let garment = data_uri(&request.garment);
        json!({
            "person_image": person,
            "garment_image": garment,
            "human": person,
            "cloth": garment,
            "seed": 42,
            "num_inference_steps": 30,
            "guidance_scale": 4.5,
        })
    }

    fn parse_created(&self, body: &str) -> PipelineResult<SubmitResponse> {
        let prediction: Prediction = serde_json::from_str(body)
            .map_err(|e| PipelineError::contract(PROVIDER_NAME, e.to_string(), body))?;
        let raw_status = prediction.status.as_deref().unwrap_or("queued");
        let status = prediction.to_status(raw_status);

        if status.status.is_terminal() {
            return settled_inline(PROVIDER_NAME, status, body);
        }
        if !status.status.is_in_progress() {
            return Err(PipelineError::contract(
                PROVIDER_NAME,
                format!("unknown prediction status '{raw_status}'"),
                body,
            ));
        }

        let status_url = prediction
            .poll_url()
            .map(|url| resolve_status_url(&self.base_url, url))
            .ok_or_else(|| {
                PipelineError::contract(PROVIDER_NAME, "Replicate did not return a prediction URL", body)
            })?;
        Ok(SubmitResponse::Accepted {
            job_id: prediction.id.clone().unwrap_or_else(|| status_url.clone()),
            status_url,
        })
    }
}

/// Inline an encoded image as a data URI, typed by its magic bytes.
fn data_uri(bytes: &[u8]) -> String {
    let mime = image::guess_format(bytes)
        .map(|format| format.to_mime_type())
        .unwrap_or("image/jpeg");
    format!(
        "data:{mime};base64,{}",
        base64::engine::general_purpose::STANDARD.encode(bytes)
    )
}

#[async_trait]
impl GenerationProvider for ReplicateClient {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn create_job(&self, request: CreateJobRequest) -> PipelineResult<SubmitResponse> {
        let url = format!("{}/v1/predictions", self.base_url);
        tracing::debug!("Creating Replicate prediction at {url}");

        let resp = self
            .authorize(self.client.post(&url))
            .json(&json!({
                "version": self.model_version,
                "input": Self::input(&request),
            }))
            .timeout(self.submit_timeout)
            .send()
            .await
            .map_err(|e| PipelineError::Provider {
                message: format!("Replicate create failed: {e}"),
                status_code: None,
            })?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| PipelineError::Provider {
            message: format!("Replicate create body read failed: {e}"),
            status_code: Some(status.as_u16()),
        })?;
        if !status.is_success() {
            return Err(submit_error(status, &body));
        }

        self.parse_created(&body)
    }

    async fn fetch_status(&self, status_url: &str, timeout: Duration) -> PipelineResult<StatusResponse> {
        let resp = self
            .authorize(self.client.get(status_url))
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| PipelineError::Provider {
                message: format!("Replicate status request failed: {e}"),
                status_code: None,
            })?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| PipelineError::Provider {
            message: format!("Replicate status body read failed: {e}"),
            status_code: Some(status.as_u16()),
        })?;
        if !status.is_success() {
            return Err(PipelineError::Provider {
                message: format!("Replicate status HTTP {status}: {body}"),
                status_code: Some(status.as_u16()),
            });
        }

        let prediction: Prediction = serde_json::from_str(&body)
            .map_err(|e| PipelineError::contract(PROVIDER_NAME, e.to_string(), &body))?;
        let raw_status = prediction.status.as_deref().ok_or_else(|| {
            PipelineError::contract(PROVIDER_NAME, "prediction has no status", &body)
        })?;
        let response = prediction.to_status(raw_status);
        if !response.status.is_known() {
            return Err(PipelineError::contract(
                PROVIDER_NAME,
                format!("unknown prediction status '{raw_status}'"),
                &body,
            ));
        }
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::test_support::solid_jpeg;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> ReplicateClient {
        ReplicateClient::new(&server.uri(), "r8_test", "abc123", Duration::from_secs(5))
    }

    fn request() -> CreateJobRequest {
        CreateJobRequest {
            person: solid_jpeg(8, 8),
            garment: solid_jpeg(8, 8),
        }
    }

    #[test]
    fn test_prediction_status_mapping() {
        assert_eq!(prediction_status("starting"), ProviderStatus::Queued);
        assert_eq!(prediction_status("processing"), ProviderStatus::Processing);
        assert_eq!(prediction_status("succeeded"), ProviderStatus::Completed);
        assert_eq!(prediction_status("canceled"), ProviderStatus::Failed);
        assert!(!prediction_status("paused").is_known());
    }

    #[test]
    fn test_data_uri_uses_sniffed_type() {
        assert!(data_uri(&solid_jpeg(4, 4)).starts_with("data:image/jpeg;base64,/9j/"));
        assert!(data_uri(b"\x89PNG\r\n\x1a\n....").starts_with("data:image/png;base64,"));
    }

    #[tokio::test]
    async fn test_create_prediction_is_accepted() {
        let server = MockServer::start().await;
        let get_url = format!("{}/v1/predictions/p_1", server.uri());
        Mock::given(method("POST"))
            .and(path("/v1/predictions"))
            .and(header("authorization", "Token r8_test"))
            .and(body_partial_json(json!({
                "version": "abc123",
                "input": {"seed": 42, "num_inference_steps": 30}
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": "p_1",
                "status": "starting",
                "urls": {"get": get_url}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let response = client(&server).create_job(request()).await.unwrap();
        assert_eq!(
            response,
            SubmitResponse::Accepted {
                job_id: "p_1".to_string(),
                status_url: get_url,
            }
        );
    }

    #[tokio::test]
    async fn test_create_without_poll_url_is_contract_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "p_1", "status": "starting"})))
            .mount(&server)
            .await;

        let err = client(&server).create_job(request()).await.unwrap_err();
        match err {
            PipelineError::ProviderContract { message, .. } => assert!(message.contains("prediction URL")),
            other => panic!("expected contract error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_create_rejected_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid token"))
            .mount(&server)
            .await;

        let err = client(&server).create_job(request()).await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Provider {
                status_code: Some(401),
                ..
            }
        ));
    }

    #[tokio::test]
    async fn test_fetch_status_takes_last_output() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/predictions/p_1"))
            .and(header("authorization", "Token r8_test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "p_1",
                "status": "succeeded",
                "output": ["https://replicate.delivery/mask.png", "https://replicate.delivery/out.png"]
            })))
            .mount(&server)
            .await;

        let url = format!("{}/v1/predictions/p_1", server.uri());
        let status = client(&server)
            .fetch_status(&url, Duration::from_secs(2))
            .await
            .unwrap();
        assert_eq!(status.status, ProviderStatus::Completed);
        assert_eq!(status.image_url.as_deref(), Some("https://replicate.delivery/out.png"));
        assert_eq!(status.provider.as_deref(), Some("replicate"));
    }

    #[tokio::test]
    async fn test_fetch_status_failed_prediction_keeps_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": "p_1",
                "status": "failed",
                "error": "CUDA out of memory"
            })))
            .mount(&server)
            .await;

        let url = format!("{}/v1/predictions/p_1", server.uri());
        let status = client(&server)
            .fetch_status(&url, Duration::from_secs(2))
            .await
            .unwrap();
        assert_eq!(status.status, ProviderStatus::Failed);
        assert_eq!(status.error.as_deref(), Some("CUDA out of memory"));
    }

    #[tokio::test]
    async fn test_fetch_status_unknown_is_contract_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "p_1", "status": "paused"})))
            .mount(&server)
            .await;

        let url = format!("{}/v1/predictions/p_1", server.uri());
        let err = client(&server)
            .fetch_status(&url, Duration::from_secs(2))
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::ProviderContract { .. }));
    }
}
