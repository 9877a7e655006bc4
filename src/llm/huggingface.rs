use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};

use super::retry::{RetryPolicy, retry_unavailable};
use super::{Completion, Provider};
use crate::config::Config;
use crate::error::{AppError, ProviderError};

/// Inference API provider. Retries with linear backoff while the model is
/// loading (HTTP 503).
pub struct HuggingFaceProvider {
    base_url: String,
    headers: HeaderMap,
    timeout: Duration,
    max_tokens: u32,
    temperature: f32,
    retry: RetryPolicy,
    default_client: BoundClient,
}

/// An HTTP client bound to one model's chat-completions route.
struct BoundClient {
    http: reqwest::Client,
    model: String,
    url: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Deserialize)]
struct InferenceError {
    error: String,
}

impl HuggingFaceProvider {
    pub fn new(config: &Config) -> Result<Self, AppError> {
        let api_key = config.hf_api_key.as_deref().unwrap_or_default();

        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {api_key}"))
                .map_err(|e| AppError::Config(format!("invalid HF_API_KEY header: {e}")))?,
        );
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            "x-wait-for-model",
            HeaderValue::from_static(bool_header(config.hf_wait_for_model)),
        );
        headers.insert(
            "x-use-cache",
            HeaderValue::from_static(bool_header(config.hf_use_cache)),
        );

        let base_url = config.hf_base_url.trim_end_matches('/').to_string();
        let default_client = bind(&base_url, &headers, config.hf_timeout, &config.hf_model)
            .map_err(|e| AppError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url,
            headers,
            timeout: config.hf_timeout,
            max_tokens: config.hf_max_tokens,
            temperature: config.hf_temperature,
            retry: RetryPolicy {
                max_attempts: config.hf_max_retries,
                backoff_unit: config.hf_retry_backoff,
            },
            default_client,
        })
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    async fn send(&self, client: &BoundClient, prompt: &str) -> Result<Completion, ProviderError> {
        let body = ChatRequest {
            model: &client.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            stream: false,
        };

        let response = client
            .http
            .post(&client.url)
            .json(&body)
            .send()
            .await
            .map_err(map_reqwest_error)?;

        let status = response.status();
        if status == StatusCode::SERVICE_UNAVAILABLE {
            return Err(ProviderError::TransientUnavailable {
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<InferenceError>(&error_body)
                .map(|e| e.error)
                .unwrap_or(error_body);
            return Err(ProviderError::Unknown(format!(
                "Inference API error ({status}): {detail}"
            )));
        }

        let resp: ChatResponse = response.json().await.map_err(map_reqwest_error)?;

        let usage = resp.usage.as_ref();
        let first = resp.choices.into_iter().next();
        let finish_reason = first
            .as_ref()
            .and_then(|c| c.finish_reason.clone())
            .unwrap_or_default();
        let content = first
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(ProviderError::EmptyResponse)?;

        Ok(Completion {
            content,
            model: resp.model.unwrap_or_else(|| client.model.clone()),
            input_tokens: usage.map(|u| u.prompt_tokens).unwrap_or(0),
            output_tokens: usage.map(|u| u.completion_tokens).unwrap_or(0),
            finish_reason,
        })
    }
}

#[async_trait::async_trait]
impl Provider for HuggingFaceProvider {
    async fn generate(
        &self,
        prompt: &str,
        model: Option<&str>,
    ) -> Result<Completion, ProviderError> {
        let override_client = match model {
            Some(m) if m != self.default_client.model => Some(
                bind(&self.base_url, &self.headers, self.timeout, m)
                    .map_err(|e| ProviderError::Unknown(e.to_string()))?,
            ),
            _ => None,
        };
        let client = override_client.as_ref().unwrap_or(&self.default_client);

        retry_unavailable(&self.retry, self.name(), |_| self.send(client, prompt)).await
    }

    fn name(&self) -> &str {
        "huggingface"
    }

    fn default_model(&self) -> &str {
        &self.default_client.model
    }
}

fn bind(
    base_url: &str,
    headers: &HeaderMap,
    timeout: Duration,
    model: &str,
) -> reqwest::Result<BoundClient> {
    let http = reqwest::Client::builder()
        .default_headers(headers.clone())
        .timeout(timeout)
        .build()?;
    Ok(BoundClient {
        http,
        model: model.to_string(),
        url: chat_url(base_url, model),
    })
}

fn chat_url(base_url: &str, model: &str) -> String {
    format!("{base_url}/models/{model}/v1/chat/completions")
}

fn bool_header(value: bool) -> &'static str {
    if value { "true" } else { "false" }
}

fn map_reqwest_error(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout
    } else if err.status() == Some(StatusCode::SERVICE_UNAVAILABLE) {
        ProviderError::TransientUnavailable { status: 503 }
    } else {
        ProviderError::Unknown(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_url() {
        assert_eq!(
            chat_url("https://api-inference.huggingface.co", "meta-llama/Meta-Llama-3-8B-Instruct"),
            "https://api-inference.huggingface.co/models/meta-llama/Meta-Llama-3-8B-Instruct/v1/chat/completions"
        );
    }

    #[test]
    fn test_bool_header() {
        assert_eq!(bool_header(true), "true");
        assert_eq!(bool_header(false), "false");
    }

    #[test]
    fn test_new_uses_config() {
        let config = Config::from_lookup(|key| match key {
            "HF_API_KEY" => Some("hf-test".to_string()),
            "HF_MODEL" => Some("Qwen/Qwen2.5-7B-Instruct".to_string()),
            "HF_MAX_RETRIES" => Some("5".to_string()),
            "HF_RETRY_BACKOFF_MS" => Some("250".to_string()),
            "HF_BASE_URL" => Some("http://localhost:9999/".to_string()),
            _ => None,
        })
        .unwrap();

        let provider = HuggingFaceProvider::new(&config).unwrap();
        assert_eq!(provider.default_model(), "Qwen/Qwen2.5-7B-Instruct");
        assert_eq!(provider.retry_policy().max_attempts, 5);
        assert_eq!(
            provider.retry_policy().backoff_unit,
            Duration::from_millis(250)
        );
        assert_eq!(
            provider.default_client.url,
            "http://localhost:9999/models/Qwen/Qwen2.5-7B-Instruct/v1/chat/completions"
        );
    }

    #[test]
    fn test_invalid_key_is_config_error() {
        let config = Config::from_lookup(|key| match key {
            "HF_API_KEY" => Some("bad\nkey".to_string()),
            _ => None,
        })
        .unwrap();

        assert!(matches!(
            HuggingFaceProvider::new(&config),
            Err(AppError::Config(_))
        ));
    }
}
