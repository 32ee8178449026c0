//! Anthropic vision backend using the Messages API.
//!
//! The assistant turn is prefilled with `{` so the model continues straight
//! into the bounding-box object instead of wrapping it in prose.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::time::{Duration, Instant};

use super::provider::{VisionProvider, VisionRequest, VisionResponse};
use crate::error::PipelineError;

const DEFAULT_ENDPOINT: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
const PREFILL: &str = "{";

/// Anthropic provider using the Messages API.
pub struct AnthropicProvider {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    timeout: Duration,
}

impl AnthropicProvider {
    pub fn new(api_key: &str, model: &str, timeout: Duration) -> Self {
        Self::with_endpoint(api_key, model, DEFAULT_ENDPOINT, timeout)
    }

    /// Create against a custom Messages endpoint (proxies, tests).
    pub fn with_endpoint(api_key: &str, model: &str, endpoint: &str, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
            model: model.to_string(),
            timeout,
        }
    }

    fn body(&self, request: &VisionRequest) -> serde_json::Value {
        json!({
            "model": self.model,
            "max_tokens": request.max_tokens,
            "messages": [
                {
                    "role": "user",
                    "content": [
                        {
                            "type": "image",
                            "source": {
                                "type": "base64",
                                "media_type": request.image.media_type,
                                "data": request.image.data,
                            }
                        },
                        { "type": "text", "text": request.prompt }
                    ]
                },
                { "role": "assistant", "content": PREFILL }
            ]
        })
    }

    fn error(message: String, status_code: Option<u16>) -> PipelineError {
        PipelineError::Vision {
            message,
            status_code,
        }
    }
}

#[derive(Deserialize)]
struct MessagesResponse {
    model: String,
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

#[async_trait]
impl VisionProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn analyze(&self, request: &VisionRequest) -> Result<VisionResponse, PipelineError> {
        let start = Instant::now();

        let resp = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&self.body(request))
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| Self::error(format!("Anthropic request failed: {e}"), None))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(Self::error(
                format!("Anthropic HTTP {status}: {text}"),
                Some(status.as_u16()),
            ));
        }

        let parsed: MessagesResponse = resp
            .json()
            .await
            .map_err(|e| Self::error(format!("Failed to parse Anthropic response: {e}"), None))?;

        if parsed.stop_reason.as_deref() == Some("max_tokens") {
            return Err(Self::error(
                "Anthropic answer was cut off before the region closed".to_string(),
                None,
            ));
        }

        let continuation = parsed
            .content
            .into_iter()
            .find(|block| block.kind == "text")
            .and_then(|block| block.text)
            .ok_or_else(|| Self::error("Anthropic returned no text block".to_string(), None))?;

        tracing::debug!("Anthropic answered in {:?}", start.elapsed());

        Ok(VisionResponse {
            text: format!("{PREFILL}{}", continuation.trim_start()).trim_end().to_string(),
            model: parsed.model,
            latency_ms: start.elapsed().as_millis() as u64,
        })
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::detect::parse_crop_region;
    use crate::vision::provider::VisionImage;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> AnthropicProvider {
        AnthropicProvider::with_endpoint(
            "ak-test",
            "claude-test",
            &format!("{}/v1/messages", server.uri()),
            Duration::from_secs(5),
        )
    }

    fn request() -> VisionRequest {
        VisionRequest::detect_subject(VisionImage::jpeg(&[0xFF, 0xD8, 0xFF]))
    }

    #[tokio::test]
    async fn test_analyze_rejoins_prefilled_region() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "ak-test"))
            .and(header("anthropic-version", API_VERSION))
            .and(body_partial_json(json!({
                "model": "claude-test",
                "max_tokens": 200
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "model": "claude-test-2025",
                "stop_reason": "end_turn",
                "content": [
                    {"type": "text", "text": "\"left\": 0.2, \"top\": 0.1, \"width\": 0.6, \"height\": 0.8}\n"}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let response = provider(&server).analyze(&request()).await.unwrap();
        assert_eq!(response.model, "claude-test-2025");

        let region = parse_crop_region(&response.text).unwrap();
        assert_eq!((region.left, region.top), (0.2, 0.1));
        assert_eq!((region.width, region.height), (0.6, 0.8));
    }

    #[tokio::test]
    async fn test_analyze_sends_prefill_turn() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "messages": [{"role": "user"}, {"role": "assistant", "content": "{"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "model": "claude-test",
                "content": [{"type": "text", "text": "\"left\":0,\"top\":0,\"width\":1,\"height\":1}"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let response = provider(&server).analyze(&request()).await.unwrap();
        assert!(response.text.starts_with("{\"left\""));
    }

    #[tokio::test]
    async fn test_analyze_reports_http_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(529).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let err = provider(&server).analyze(&request()).await.unwrap_err();
        match err {
            PipelineError::Vision {
                status_code: Some(529),
                message,
            } => assert!(message.contains("overloaded")),
            other => panic!("expected HTTP error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_truncated_answer_is_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "model": "claude-test",
                "stop_reason": "max_tokens",
                "content": [{"type": "text", "text": "\"left\": 0.2, \"top\""}]
            })))
            .mount(&server)
            .await;

        let err = provider(&server).analyze(&request()).await.unwrap_err();
        assert!(err.to_string().contains("cut off"), "got: {err}");
    }
}
