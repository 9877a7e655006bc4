use std::time::Duration;

use async_openai::{
    Client,
    config::OpenAIConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestUserMessage,
        ChatCompletionRequestUserMessageContent, CreateChatCompletionRequest,
    },
};

use super::{Completion, Provider};
use crate::config::Config;
use crate::error::ProviderError;

/// Single-shot provider: one request per call, no retries.
pub struct OpenAIProvider {
    client: Client<OpenAIConfig>,
    model: String,
    max_tokens: u32,
    temperature: f32,
}

impl OpenAIProvider {
    pub fn new(config: &Config) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(config.openai_api_key.clone().unwrap_or_default())
            .with_api_base(config.openai_base_url.trim_end_matches('/'));
        Self {
            client: Client::with_config(openai_config).with_backoff(single_attempt()),
            model: config.openai_model.clone(),
            max_tokens: config.openai_max_tokens,
            temperature: config.openai_temperature,
        }
    }
}

/// Stops the client's built-in retry loop after the first attempt.
fn single_attempt() -> backoff::ExponentialBackoff {
    backoff::ExponentialBackoffBuilder::new()
        .with_max_elapsed_time(Some(Duration::ZERO))
        .build()
}

#[async_trait::async_trait]
impl Provider for OpenAIProvider {
    async fn generate(
        &self,
        prompt: &str,
        model: Option<&str>,
    ) -> Result<Completion, ProviderError> {
        let messages = vec![ChatCompletionRequestMessage::User(
            ChatCompletionRequestUserMessage {
                content: ChatCompletionRequestUserMessageContent::Text(prompt.to_string()),
                name: None,
            },
        )];

        #[allow(deprecated)]
        let request = CreateChatCompletionRequest {
            model: model.unwrap_or(&self.model).to_string(),
            messages,
            temperature: Some(self.temperature),
            max_completion_tokens: Some(self.max_tokens),
            ..Default::default()
        };

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(map_openai_error)?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .filter(|c| !c.trim().is_empty())
            .ok_or(ProviderError::EmptyResponse)?;

        let finish_reason = response
            .choices
            .first()
            .and_then(|c| c.finish_reason)
            .map(|r| format!("{r:?}").to_lowercase())
            .unwrap_or_default();

        let (input_tokens, output_tokens) = match &response.usage {
            Some(usage) => (usage.prompt_tokens, usage.completion_tokens),
            None => (0, 0),
        };

        Ok(Completion {
            content,
            model: response.model,
            input_tokens,
            output_tokens,
            finish_reason,
        })
    }

    fn name(&self) -> &str {
        "openai"
    }

    fn default_model(&self) -> &str {
        &self.model
    }
}

fn map_openai_error(err: OpenAIError) -> ProviderError {
    match &err {
        OpenAIError::Reqwest(e) if e.is_timeout() => ProviderError::Timeout,
        OpenAIError::Reqwest(_) | OpenAIError::ApiError(_) => {
            ProviderError::Unknown(err.to_string())
        }
        _ => {
            let message = err.to_string();
            if is_timeout_message(&message) {
                ProviderError::Timeout
            } else {
                ProviderError::Unknown(message)
            }
        }
    }
}

fn is_timeout_message(message: &str) -> bool {
    let lower = message.to_lowercase();
    lower.contains("timed out") || lower.contains("timeout") || lower.contains("deadline")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_messages() {
        let cases = vec![
            ("error sending request: operation timed out", true),
            ("context deadline exceeded", true),
            ("Timeout waiting for response", true),
            ("invalid api key", false),
            ("connection refused", false),
        ];
        for (msg, expected) in cases {
            assert_eq!(is_timeout_message(msg), expected, "{msg:?}");
        }
    }

    #[test]
    fn test_api_error_mentioning_timeout_is_not_a_timeout() {
        let err = OpenAIError::ApiError(async_openai::error::ApiError {
            message: "Invalid value for 'timeout': must be positive".to_string(),
            r#type: Some("invalid_request_error".to_string()),
            param: Some("timeout".to_string()),
            code: None,
        });

        match map_openai_error(err) {
            ProviderError::Unknown(msg) => assert!(msg.contains("timeout"), "{msg}"),
            other => panic!("expected Unknown, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_transport_timeout_maps_to_timeout() {
        // Accepts connections but never answers.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _server = tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((stream, _)) = listener.accept().await {
                held.push(stream);
            }
        });

        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .unwrap();
        let err = http.get(format!("http://{addr}/")).send().await.unwrap_err();
        assert!(err.is_timeout());

        assert_eq!(map_openai_error(OpenAIError::Reqwest(err)), ProviderError::Timeout);
    }

    #[test]
    fn test_single_attempt_backoff_never_schedules_a_retry() {
        use backoff::backoff::Backoff;

        let mut policy = single_attempt();
        assert_eq!(policy.next_backoff(), None);
    }

    #[test]
    fn test_default_model_from_config() {
        let config = Config::from_lookup(|key| match key {
            "OPENAI_API_KEY" => Some("sk-test".to_string()),
            "OPENAI_MODEL" => Some("gpt-4".to_string()),
            _ => None,
        })
        .unwrap();

        let provider = OpenAIProvider::new(&config);
        assert_eq!(provider.default_model(), "gpt-4");
        assert_eq!(provider.name(), "openai");
    }
}
