use async_trait::async_trait;
use backoff::{future::retry, Error as BackoffError, ExponentialBackoff};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::llm::types::*;
use crate::llm::ReasoningService;

pub const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Anthropic Messages API client.
pub struct LlmClient {
    http: Client,
    config: LlmConfig,
    api_key: String,
}

impl std::fmt::Debug for LlmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmClient")
            .field("config", &self.config)
            .field("api_key", &"<REDACTED>")
            .finish()
    }
}

impl LlmClient {
    pub fn new(config: LlmConfig, api_key: String) -> Result<Self, LlmError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config, api_key })
    }

    async fn send_once(
        &self,
        url: &str,
        request: &MessagesRequest<'_>,
    ) -> Result<MessagesResponse, BackoffError<LlmError>> {
        let response = self
            .http
            .post(url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| BackoffError::transient(LlmError::Http(e.to_string())))?;

        let status = response.status();

        if status.is_success() {
            return response
                .json::<MessagesResponse>()
                .await
                .map_err(|e| BackoffError::permanent(LlmError::InvalidResponse(e.to_string())));
        }

        let error_text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorBody>(&error_text)
            .map(|body| match body.error.error_type {
                Some(kind) => format!("{} ({})", body.error.message, kind),
                None => body.error.message,
            })
            .unwrap_or(error_text);

        match status {
            StatusCode::TOO_MANY_REQUESTS => Err(BackoffError::transient(LlmError::RateLimited)),
            StatusCode::UNAUTHORIZED => Err(BackoffError::permanent(LlmError::Api {
                status: 401,
                message: "Invalid API key".to_string(),
            })),
            _ if status.is_server_error() => {
                Err(BackoffError::transient(LlmError::Api {
                    status: status.as_u16(),
                    message,
                }))
            }
            _ => Err(BackoffError::permanent(LlmError::Api {
                status: status.as_u16(),
                message,
            })),
        }
    }
}

#[async_trait]
impl ReasoningService for LlmClient {
    async fn exchange(
        &self,
        messages: &[ChatMessage],
        tools: &[Value],
    ) -> Result<LlmResponse, LlmError> {
        if self.api_key.is_empty() {
            return Err(LlmError::MissingApiKey);
        }

        let request = MessagesRequest {
            model: &self.config.model,
            max_tokens: self.config.max_tokens,
            messages,
            tools,
        };

        let url = format!("{}/v1/messages", self.config.base_url.trim_end_matches('/'));

        debug!(
            model = %self.config.model,
            message_count = messages.len(),
            tool_count = tools.len(),
            "sending messages request"
        );

        let result = match self.config.retry_window {
            Some(window) => {
                let backoff = ExponentialBackoff {
                    initial_interval: Duration::from_millis(500),
                    max_interval: Duration::from_secs(4),
                    max_elapsed_time: Some(window),
                    ..Default::default()
                };
                retry(backoff, || self.send_once(&url, &request)).await?
            }
            None => self.send_once(&url, &request).await.map_err(|e| match e {
                BackoffError::Permanent(err) => err,
                BackoffError::Transient { err, .. } => err,
            })?,
        };

        debug!(
            response_id = %result.id,
            model = %result.model,
            stop_reason = ?result.stop_reason,
            "received messages response"
        );

        let content = result
            .content
            .into_iter()
            .filter(|block| !matches!(block, ContentBlock::Unsupported))
            .collect();

        Ok(LlmResponse {
            stop_reason: result.stop_reason,
            content,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, retry_window: Option<Duration>) -> LlmClient {
        let config = LlmConfig {
            base_url: server.uri(),
            model: "claude-test".to_string(),
            max_tokens: 1024,
            timeout: Duration::from_secs(5),
            retry_window,
        };
        LlmClient::new(config, "test-key".to_string()).unwrap()
    }

    fn tool_use_body() -> Value {
        json!({
            "id": "msg_01",
            "type": "message",
            "role": "assistant",
            "model": "claude-test",
            "stop_reason": "tool_use",
            "content": [
                { "type": "text", "text": "Checking the file." },
                { "type": "tool_use", "id": "toolu_1", "name": "read-file", "input": { "path": "a.ts" } }
            ]
        })
    }

    #[tokio::test]
    async fn sends_transcript_and_tools_in_messages_shape() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "test-key"))
            .and(header("anthropic-version", ANTHROPIC_VERSION))
            .and(body_partial_json(json!({
                "model": "claude-test",
                "max_tokens": 1024,
                "messages": [
                    { "role": "user", "content": [{ "type": "text", "text": "it broke" }] }
                ],
                "tools": [{ "name": "read-file" }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(tool_use_body()))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        let tools = vec![json!({ "name": "read-file", "input_schema": { "type": "object" } })];
        let response = client
            .exchange(&[ChatMessage::user_text("it broke")], &tools)
            .await
            .unwrap();

        assert!(response.declares_tool_use());
        let msg = ChatMessage::assistant(response.content);
        assert_eq!(msg.tool_calls()[0].name, "read-file");
        assert_eq!(msg.text().as_deref(), Some("Checking the file."));
    }

    #[tokio::test]
    async fn unauthorized_is_permanent() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "type": "error",
                "error": { "type": "authentication_error", "message": "invalid x-api-key" }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Some(Duration::from_secs(2)));
        let err = client
            .exchange(&[ChatMessage::user_text("x")], &[])
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Api { status: 401, .. }));
    }

    #[tokio::test]
    async fn rate_limit_without_retry_window_fails_immediately() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(429))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        let err = client
            .exchange(&[ChatMessage::user_text("x")], &[])
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::RateLimited));
    }

    #[tokio::test]
    async fn server_error_is_retried_within_window() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(529).set_body_json(json!({
                "type": "error",
                "error": { "type": "overloaded_error", "message": "Overloaded" }
            })))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(tool_use_body()))
            .mount(&server)
            .await;

        let client = client_for(&server, Some(Duration::from_secs(10)));
        let response = client
            .exchange(&[ChatMessage::user_text("x")], &[])
            .await
            .unwrap();
        assert_eq!(response.content.len(), 2);
    }

    #[tokio::test]
    async fn bad_request_carries_api_message() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "type": "error",
                "error": { "type": "invalid_request_error", "message": "messages: roles must alternate" }
            })))
            .mount(&server)
            .await;

        let client = client_for(&server, None);
        let err = client
            .exchange(&[ChatMessage::user_text("x")], &[])
            .await
            .unwrap_err();
        match err {
            LlmError::Api { status, message } => {
                assert_eq!(status, 400);
                assert!(message.contains("roles must alternate"));
                assert!(message.contains("invalid_request_error"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_api_key_is_rejected_before_sending() {
        let server = MockServer::start().await;
        let config = LlmConfig {
            base_url: server.uri(),
            model: "m".to_string(),
            max_tokens: 1,
            timeout: Duration::from_secs(1),
            retry_window: None,
        };
        let client = LlmClient::new(config, String::new()).unwrap();
        let err = client.exchange(&[], &[]).await.unwrap_err();
        assert!(matches!(err, LlmError::MissingApiKey));
    }
}
