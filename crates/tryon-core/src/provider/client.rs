//! Generation provider trait and the HTTP client for the try-on API.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;
use std::sync::Arc;
use std::time::Duration;

use crate::config::{resolve_env_var, ProviderConfig};
use crate::error::{PipelineError, PipelineResult};

use super::status::{ProviderStatus, StatusResponse};

const PROVIDER_NAME: &str = "tryon-api";

/// Images for one create-job request, as encoded bytes.
#[derive(Debug, Clone)]
pub struct CreateJobRequest {
    pub person: Vec<u8>,
    pub garment: Vec<u8>,
}

/// What the provider answered to a create-job request.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitResponse {
    /// The provider finished synchronously
    Inline(StatusResponse),
    /// The job was accepted; poll `status_url` (always absolute)
    Accepted { job_id: String, status_url: String },
}

/// Trait implemented by generation backends.
///
/// The pipeline holds an `Arc<dyn GenerationProvider>` so tests can inject
/// doubles.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    /// Provider name for logging.
    fn name(&self) -> &str;

    /// Create one generation job.
    async fn create_job(&self, request: CreateJobRequest) -> PipelineResult<SubmitResponse>;

    /// One status request, bounded by `timeout`.
    async fn fetch_status(&self, status_url: &str, timeout: Duration) -> PipelineResult<StatusResponse>;
}

/// Factory that creates the configured generation backend.
pub struct GenerationProviderFactory;

impl GenerationProviderFactory {
    /// Create the backend named by `provider.backend`.
    ///
    /// Fails when the backend is unknown or its credentials do not resolve.
    pub fn create(config: &ProviderConfig) -> PipelineResult<Arc<dyn GenerationProvider>> {
        match config.backend.as_str() {
            "tryon-api" => Ok(Arc::new(TryOnApiClient::from_config(config)?)),
            "replicate" => Ok(Arc::new(super::replicate::ReplicateClient::from_config(config)?)),
            other => Err(PipelineError::Provider {
                message: format!("Unknown generation backend: {other}"),
                status_code: None,
            }),
        }
    }
}

/// Client for the try-on API (`POST /api/v1/tryon`, `GET <statusUrl>`).
pub struct TryOnApiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    fast_mode: bool,
    submit_timeout: Duration,
}

impl TryOnApiClient {
    pub fn new(base_url: &str, api_key: &str, fast_mode: bool, submit_timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            fast_mode,
            submit_timeout,
        }
    }

    /// Build from the `[provider]` config section. The API key must resolve.
    pub fn from_config(config: &ProviderConfig) -> PipelineResult<Self> {
        let api_key = resolve_env_var(&config.api_key).ok_or_else(|| PipelineError::Provider {
            message: "Try-on API key not set. Set TRYON_API_KEY env var.".to_string(),
            status_code: None,
        })?;
        Ok(Self::new(
            &config.base_url,
            &api_key,
            config.fast_mode,
            Duration::from_millis(config.submit_timeout_ms),
        ))
    }

    /// Resolve a status URL from the provider against the configured base.
    pub fn resolve_status_url(&self, status_url: &str) -> String {
        resolve_status_url(&self.base_url, status_url)
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .bearer_auth(&self.api_key)
            .header("x-api-key", &self.api_key)
    }

    fn image_part(bytes: Vec<u8>, file_name: &'static str) -> PipelineResult<Part> {
        Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("image/jpeg")
            .map_err(|e| PipelineError::Provider {
                message: format!("Failed to build multipart body: {e}"),
                status_code: None,
            })
    }

    fn parse_submit(&self, body: &str) -> PipelineResult<SubmitResponse> {
        let value: serde_json::Value = serde_json::from_str(body)
            .map_err(|e| PipelineError::contract(PROVIDER_NAME, e.to_string(), body))?;

        let field = |name: &str| {
            value
                .get(name)
                .and_then(|v| v.as_str())
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        if let (Some(job_id), Some(status_url)) = (field("jobId"), field("statusUrl")) {
            return Ok(SubmitResponse::Accepted {
                job_id,
                status_url: self.resolve_status_url(&status_url),
            });
        }

        if value.get("status").is_some() {
            let inline = serde_json::from_value::<StatusResponse>(value.clone())
                .map_err(|e| PipelineError::contract(PROVIDER_NAME, e.to_string(), body))?;
            return settled_inline(PROVIDER_NAME, inline, body);
        }

        Err(PipelineError::contract(
            PROVIDER_NAME,
            "missing jobId or statusUrl",
            body,
        ))
    }
}

/// Join a relative status path onto `base_url`; absolute URLs pass through.
pub fn resolve_status_url(base_url: &str, status_url: &str) -> String {
    let lower = status_url.get(..8).unwrap_or(status_url).to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        return status_url.to_string();
    }
    let base = base_url.trim_end_matches('/');
    if status_url.starts_with('/') {
        format!("{base}{status_url}")
    } else {
        format!("{base}/{status_url}")
    }
}

/// Accept a synchronous create-job answer only when there is nothing left to poll.
///
/// Without a job descriptor an in-progress or unrecognized status could never
/// be resolved, so it is a contract violation.
pub(crate) fn settled_inline(
    provider: &str,
    inline: StatusResponse,
    body: &str,
) -> PipelineResult<SubmitResponse> {
    if matches!(inline.status, ProviderStatus::Completed | ProviderStatus::Failed) {
        return Ok(SubmitResponse::Inline(inline));
    }
    Err(PipelineError::contract(
        provider,
        format!("status \"{}\" without a job to poll", inline.status),
        body,
    ))
}

/// Classify a non-success HTTP status from the create-job call.
pub(crate) fn submit_error(status: StatusCode, body: &str) -> PipelineError {
    let detail = if body.is_empty() {
        status.canonical_reason().unwrap_or("no body").to_string()
    } else {
        body.to_string()
    };
    let message = match status.as_u16() {
        401 | 403 => format!("Unauthorized: try-on API rejected the credentials ({status}): {detail}"),
        402 => format!("Insufficient credits for try-on generation ({status}): {detail}"),
        _ => format!("Try-on API error ({status}): {detail}"),
    };
    PipelineError::Provider {
        message,
        status_code: Some(status.as_u16()),
    }
}

#[async_trait]
impl GenerationProvider for TryOnApiClient {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    async fn create_job(&self, request: CreateJobRequest) -> PipelineResult<SubmitResponse> {
        let form = Form::new()
            .part("person_images", Self::image_part(request.person, "person.jpg")?)
            .part("garment_images", Self::image_part(request.garment, "garment.jpg")?)
            .text("fast_mode", self.fast_mode.to_string());

        let url = format!("{}/api/v1/tryon", self.base_url);
        tracing::debug!("Creating try-on job at {url}");

        let resp = self
            .authorize(self.client.post(&url))
            .multipart(form)
            .timeout(self.submit_timeout)
            .send()
            .await
            .map_err(|e| PipelineError::Provider {
                message: format!("Try-on API request failed: {e}"),
                status_code: None,
            })?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| PipelineError::Provider {
            message: format!("Create-job body read failed: {e}"),
            status_code: Some(status.as_u16()),
        })?;
        if !status.is_success() {
            return Err(submit_error(status, &body));
        }

        self.parse_submit(&body)
    }

    async fn fetch_status(&self, status_url: &str, timeout: Duration) -> PipelineResult<StatusResponse> {
        let resp = self
            .authorize(self.client.get(status_url))
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| PipelineError::Provider {
                message: format!("Status request failed: {e}"),
                status_code: None,
            })?;

        let status = resp.status();
        let body = resp.text().await.map_err(|e| PipelineError::Provider {
            message: format!("Status body read failed: {e}"),
            status_code: Some(status.as_u16()),
        })?;
        if !status.is_success() {
            return Err(PipelineError::Provider {
                message: format!("Status HTTP {status}: {body}"),
                status_code: Some(status.as_u16()),
            });
        }

        StatusResponse::parse(&body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> TryOnApiClient {
        TryOnApiClient::new(&server.uri(), "ta_test", true, Duration::from_secs(5))
    }

    // ASCII payloads keep the multipart body matchable as text
    fn request() -> CreateJobRequest {
        CreateJobRequest {
            person: b"person-jpeg".to_vec(),
            garment: b"garment-jpeg".to_vec(),
        }
    }

    #[test]
    fn test_factory_selects_backend() {
        let mut config = ProviderConfig {
            api_key: "ta_test".to_string(),
            ..ProviderConfig::default()
        };
        assert_eq!(GenerationProviderFactory::create(&config).unwrap().name(), "tryon-api");

        config.backend = "replicate".to_string();
        config.replicate = Some(crate::config::ReplicateConfig {
            api_token: "r8_test".to_string(),
            model_version: "abc123".to_string(),
            ..Default::default()
        });
        assert_eq!(GenerationProviderFactory::create(&config).unwrap().name(), "replicate");

        config.backend = "clothflow".to_string();
        assert!(GenerationProviderFactory::create(&config).is_err());
    }

    #[test]
    fn test_resolve_status_url() {
        let base = "https://tryon-api.com/";
        assert_eq!(
            resolve_status_url(base, "/api/v1/tryon/status/j1"),
            "https://tryon-api.com/api/v1/tryon/status/j1"
        );
        assert_eq!(
            resolve_status_url(base, "api/v1/tryon/status/j1"),
            "https://tryon-api.com/api/v1/tryon/status/j1"
        );
        assert_eq!(
            resolve_status_url(base, "https://status.tryon-api.com/j1"),
            "https://status.tryon-api.com/j1"
        );
    }

    #[tokio::test]
    async fn test_create_job_accepted() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/tryon"))
            .and(header("authorization", "Bearer ta_test"))
            .and(header("x-api-key", "ta_test"))
            .and(body_string_contains("name=\"person_images\""))
            .and(body_string_contains("name=\"garment_images\""))
            .and(body_string_contains("name=\"fast_mode\""))
            .respond_with(ResponseTemplate::new(202).set_body_json(serde_json::json!({
                "jobId": "job_42",
                "statusUrl": "/api/v1/tryon/status/job_42"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let response = client(&server).create_job(request()).await.unwrap();
        assert_eq!(
            response,
            SubmitResponse::Accepted {
                job_id: "job_42".to_string(),
                status_url: format!("{}/api/v1/tryon/status/job_42", server.uri()),
            }
        );
    }

    #[tokio::test]
    async fn test_create_job_inline_result() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "completed",
                "imageUrl": "https://cdn.example.com/out.jpg"
            })))
            .mount(&server)
            .await;

        match client(&server).create_job(request()).await.unwrap() {
            SubmitResponse::Inline(status) => {
                assert_eq!(status.status, ProviderStatus::Completed);
                assert_eq!(status.image_url.as_deref(), Some("https://cdn.example.com/out.jpg"));
            }
            other => panic!("expected inline result, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_create_job_unsettled_inline_is_contract_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": "banana"})))
            .mount(&server)
            .await;

        let err = client(&server).create_job(request()).await.unwrap_err();
        match err {
            PipelineError::ProviderContract { payload, .. } => assert!(payload.contains("banana")),
            other => panic!("expected contract error, got {other:?}"),
        }

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"status": "processing"})))
            .mount(&server)
            .await;

        let err = client(&server).create_job(request()).await.unwrap_err();
        assert!(matches!(err, PipelineError::ProviderContract { .. }), "got: {err:?}");
    }

    #[tokio::test]
    async fn test_create_job_inline_failure_is_accepted() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "failed",
                "error": "No person detected"
            })))
            .mount(&server)
            .await;

        match client(&server).create_job(request()).await.unwrap() {
            SubmitResponse::Inline(status) => {
                assert_eq!(status.status, ProviderStatus::Failed);
                assert_eq!(status.error.as_deref(), Some("No person detected"));
            }
            other => panic!("expected inline result, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_create_job_missing_descriptor_is_contract_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(202).set_body_json(serde_json::json!({"jobId": "job_1"})))
            .mount(&server)
            .await;

        let err = client(&server).create_job(request()).await.unwrap_err();
        match err {
            PipelineError::ProviderContract { payload, .. } => assert!(payload.contains("job_1")),
            other => panic!("expected contract error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_create_job_classifies_auth_and_credits() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("x-api-key", "ta_test"))
            .respond_with(ResponseTemplate::new(402).set_body_string("out of credits"))
            .mount(&server)
            .await;

        let err = client(&server).create_job(request()).await.unwrap_err();
        assert!(err.to_string().contains("Insufficient credits"), "got: {err}");

        let other = TryOnApiClient::new(&server.uri(), "ta_wrong", true, Duration::from_secs(5));
        Mock::given(method("POST"))
            .and(header("x-api-key", "ta_wrong"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;
        let err = other.create_job(request()).await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Provider {
                status_code: Some(401),
                ..
            }
        ));
        assert!(err.to_string().contains("Unauthorized"));
    }

    #[tokio::test]
    async fn test_create_job_truncated_body_is_provider_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut chunk = [0u8; 4096];
            while !request.ends_with(b"--\r\n") {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&chunk[..n]);
            }
            // Promise more body than is sent, then hang up
            socket
                .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 100\r\n\r\n{\"jobId\"")
                .await
                .unwrap();
        });

        let client = TryOnApiClient::new(&format!("http://{addr}"), "ta_test", true, Duration::from_secs(5));
        let err = client.create_job(request()).await.unwrap_err();
        match err {
            PipelineError::Provider { message, .. } => assert!(message.contains("body read"), "got: {message}"),
            other => panic!("expected provider error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_fetch_status_sends_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/v1/tryon/status/job_42"))
            .and(header("authorization", "Bearer ta_test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "status": "processing_from_queue",
                "jobId": "job_42"
            })))
            .mount(&server)
            .await;

        let url = format!("{}/api/v1/tryon/status/job_42", server.uri());
        let status = client(&server)
            .fetch_status(&url, Duration::from_secs(2))
            .await
            .unwrap();
        assert_eq!(status.status, ProviderStatus::ProcessingFromQueue);
    }

    #[tokio::test]
    async fn test_fetch_status_http_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let url = format!("{}/status", server.uri());
        let err = client(&server)
            .fetch_status(&url, Duration::from_secs(2))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Provider {
                status_code: Some(503),
                ..
            }
        ));
    }
}
