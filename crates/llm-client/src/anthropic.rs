use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{LlmError, LlmResult};
use crate::provider::{send_json, ChatModel};
use crate::{GenerationSettings, ProviderSettings};

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// Anthropic Messages API client
#[derive(Clone)]
pub struct AnthropicClient {
    client: reqwest::Client,
    settings: ProviderSettings,
    generation: GenerationSettings,
}

impl AnthropicClient {
    pub fn new(settings: ProviderSettings, generation: GenerationSettings) -> LlmResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(generation.timeout)
            .build()?;

        Ok(Self {
            client,
            settings,
            generation,
        })
    }

    pub fn model(&self) -> &str {
        &self.settings.model
    }

    fn backoff(&self) -> Duration {
        self.generation.retry_backoff
    }
}

#[async_trait]
impl ChatModel for AnthropicClient {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> LlmResult<String> {
        let body = MessagesRequest {
            model: &self.settings.model,
            max_tokens: self.generation.max_tokens,
            temperature: self.generation.temperature,
            system: system_prompt,
            messages: vec![Message {
                role: "user",
                content: user_prompt,
            }],
        };

        let request = self
            .client
            .post(format!("{}/v1/messages", self.settings.base_url.trim_end_matches('/')))
            .header("x-api-key", &self.settings.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body);

        tracing::debug!(model = %self.settings.model, "Sending Anthropic completion request");
        let response: MessagesResponse = send_json(request, self.backoff(), self.backend_name()).await?;

        let text: String = response
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("");

        if text.trim().is_empty() {
            return Err(LlmError::InvalidResponse("empty completion".to_string()));
        }
        Ok(text)
    }

    fn backend_name(&self) -> &'static str {
        "anthropic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, timeout: Duration) -> AnthropicClient {
        AnthropicClient::new(
            ProviderSettings {
                api_key: "test-key".into(),
                model: "claude-test".into(),
                base_url: server.uri(),
            },
            GenerationSettings {
                timeout,
                max_tokens: 256,
                temperature: 0.2,
                retry_backoff: Duration::from_millis(10),
            },
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_complete_joins_text_blocks() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "test-key"))
            .and(header("anthropic-version", ANTHROPIC_VERSION))
            .and(body_partial_json(json!({
                "model": "claude-test",
                "system": "be terse",
                "messages": [{"role": "user", "content": "SOL?"}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [
                    {"type": "text", "text": "{\"action\":"},
                    {"type": "text", "text": "\"bullish\"}"}
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(5));
        let text = client.complete("be terse", "SOL?").await.unwrap();
        assert_eq!(text, "{\"action\":\"bullish\"}");
    }

    #[tokio::test]
    async fn test_retries_once_when_overloaded() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(529))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [{"type": "text", "text": "neutral"}]
            })))
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(5));
        assert_eq!(client.complete("s", "u").await.unwrap(), "neutral");
    }

    #[tokio::test]
    async fn test_server_error_reports_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_secs(5));
        let err = client.complete("s", "u").await.unwrap_err();
        assert!(matches!(err, LlmError::Backend { status: 500, .. }), "{err}");
        assert!(!err.is_overloaded());
    }

    #[tokio::test]
    async fn test_slow_backend_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_delay(Duration::from_millis(500))
                    .set_body_json(json!({"content": []})),
            )
            .mount(&server)
            .await;

        let client = client_for(&server, Duration::from_millis(50));
        let err = client.complete("s", "u").await.unwrap_err();
        assert!(matches!(err, LlmError::Timeout));
    }
}
