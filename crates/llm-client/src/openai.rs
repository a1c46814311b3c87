use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{LlmError, LlmResult};
use crate::provider::{send_json, ChatModel};
use crate::{GenerationSettings, ProviderSettings};

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI chat completions client
#[derive(Clone)]
pub struct OpenAiClient {
    client: reqwest::Client,
    settings: ProviderSettings,
    generation: GenerationSettings,
}

impl OpenAiClient {
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
}

#[async_trait]
impl ChatModel for OpenAiClient {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> LlmResult<String> {
        let body = ChatRequest {
            model: &self.settings.model,
            max_tokens: self.generation.max_tokens,
            temperature: self.generation.temperature,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
        };

        let request = self
            .client
            .post(format!(
                "{}/v1/chat/completions",
                self.settings.base_url.trim_end_matches('/')
            ))
            .bearer_auth(&self.settings.api_key)
            .json(&body);

        tracing::debug!(model = %self.settings.model, "Sending OpenAI completion request");
        let response: ChatResponse =
            send_json(request, self.generation.retry_backoff, self.backend_name()).await?;

        response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| LlmError::InvalidResponse("no completion choices".to_string()))
    }

    fn backend_name(&self) -> &'static str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> OpenAiClient {
        OpenAiClient::new(
            ProviderSettings {
                api_key: "sk-test".into(),
                model: "gpt-test".into(),
                base_url: server.uri(),
            },
            GenerationSettings {
                timeout: Duration::from_secs(5),
                max_tokens: 128,
                temperature: 0.7,
                retry_backoff: Duration::from_millis(10),
            },
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_complete_reads_first_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "bearish"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let text = client_for(&server).complete("sys", "user").await.unwrap();
        assert_eq!(text, "bearish");
    }

    #[tokio::test]
    async fn test_empty_choices_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let err = client_for(&server).complete("sys", "user").await.unwrap_err();
        assert!(matches!(err, LlmError::InvalidResponse(_)));
    }

    #[tokio::test]
    async fn test_rate_limit_twice_gives_up() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .expect(2)
            .mount(&server)
            .await;

        let err = client_for(&server).complete("sys", "user").await.unwrap_err();
        assert!(err.is_overloaded(), "{err}");
    }
}
