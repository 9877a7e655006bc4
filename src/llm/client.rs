use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use opentelemetry::KeyValue;
use tracing::Instrument;
use tracing_opentelemetry::OpenTelemetrySpanExt;

use super::huggingface::HuggingFaceProvider;
use super::openai::OpenAIProvider;
use super::{Completion, Provider, ProviderKind};
use crate::config::Config;
use crate::error::{AppError, ProviderError};
use crate::prompts::Stage;
use crate::telemetry::metrics::{
    GEN_AI_ERROR_COUNT, GEN_AI_OPERATION_DURATION, GEN_AI_TOKEN_USAGE,
};

#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub provider: ProviderKind,
    pub model: Option<String>,
    pub prompt: String,
    pub stage: Stage,
}

/// Registry of providers, wrapping every call in a `gen_ai.chat` span and
/// recording client metrics.
#[derive(Clone, Default)]
pub struct LlmClient {
    providers: HashMap<ProviderKind, Arc<dyn Provider>>,
}

impl LlmClient {
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        Ok(Self::default()
            .with_provider(
                ProviderKind::OpenAi,
                Arc::new(OpenAIProvider::new(config)),
            )
            .with_provider(
                ProviderKind::HuggingFace,
                Arc::new(HuggingFaceProvider::new(config)?),
            ))
    }

    pub fn with_provider(mut self, kind: ProviderKind, provider: Arc<dyn Provider>) -> Self {
        self.providers.insert(kind, provider);
        self
    }

    pub fn provider(&self, kind: ProviderKind) -> Result<&dyn Provider, AppError> {
        self.providers
            .get(&kind)
            .map(|p| p.as_ref())
            .ok_or_else(|| AppError::UnsupportedProvider(kind.to_string()))
    }

    /// Model used when a request carries no override.
    pub fn resolve_model(&self, kind: ProviderKind, model: Option<&str>) -> Result<String, AppError> {
        let provider = self.provider(kind)?;
        Ok(model.unwrap_or(provider.default_model()).to_string())
    }

    pub async fn generate(&self, req: &GenerateRequest) -> Result<Completion, ProviderError> {
        let provider = match self.provider(req.provider) {
            Ok(p) => p,
            Err(err) => return Err(ProviderError::Unknown(err.to_string())),
        };
        let provider_name = provider.name().to_string();
        let request_model = req
            .model
            .clone()
            .unwrap_or_else(|| provider.default_model().to_string());
        let start = Instant::now();

        let span = tracing::info_span!(
            "gen_ai.chat",
            otel.name = %format!("gen_ai.chat {request_model}"),
            gen_ai.operation.name = "chat",
            gen_ai.provider.name = %provider_name,
            gen_ai.request.model = %request_model,
            gen_ai.response.model = tracing::field::Empty,
            gen_ai.usage.input_tokens = tracing::field::Empty,
            gen_ai.usage.output_tokens = tracing::field::Empty,
            gen_ai.response.finish_reasons = tracing::field::Empty,
            pipeline.stage = req.stage.index() as i64,
            otel.status_code = tracing::field::Empty,
            error.type = tracing::field::Empty,
        );

        span.add_event(
            "gen_ai.user.message",
            vec![KeyValue::new("gen_ai.prompt", truncate(&req.prompt, 1000))],
        );

        let result = provider
            .generate(&req.prompt, req.model.as_deref())
            .instrument(span.clone())
            .await;

        let duration = start.elapsed().as_secs_f64();
        let provider_kv = KeyValue::new("gen_ai.provider.name", provider_name.clone());
        let model_kv = KeyValue::new("gen_ai.request.model", request_model.clone());

        match &result {
            Ok(resp) => {
                span.record("gen_ai.response.model", resp.model.as_str());
                span.record("gen_ai.usage.input_tokens", resp.input_tokens as i64);
                span.record("gen_ai.usage.output_tokens", resp.output_tokens as i64);
                if !resp.finish_reason.is_empty() {
                    span.record(
                        "gen_ai.response.finish_reasons",
                        resp.finish_reason.as_str(),
                    );
                }

                span.add_event(
                    "gen_ai.assistant.message",
                    vec![KeyValue::new(
                        "gen_ai.completion",
                        truncate(&resp.content, 2000),
                    )],
                );

                let op_kv = KeyValue::new("gen_ai.operation.name", "chat");
                GEN_AI_TOKEN_USAGE.record(
                    f64::from(resp.input_tokens),
                    &[
                        KeyValue::new("gen_ai.token.type", "input"),
                        op_kv.clone(),
                        provider_kv.clone(),
                        model_kv.clone(),
                    ],
                );
                GEN_AI_TOKEN_USAGE.record(
                    f64::from(resp.output_tokens),
                    &[
                        KeyValue::new("gen_ai.token.type", "output"),
                        op_kv.clone(),
                        provider_kv.clone(),
                        model_kv.clone(),
                    ],
                );
                GEN_AI_OPERATION_DURATION.record(duration, &[op_kv, provider_kv, model_kv]);
            }
            Err(err) => {
                span.record("otel.status_code", "ERROR");
                span.record("error.type", err.error_type());

                tracing::warn!(
                    parent: &span,
                    provider = %provider_name,
                    model = %request_model,
                    error = %err,
                    "LLM call failed"
                );

                GEN_AI_ERROR_COUNT.add(
                    1,
                    &[
                        provider_kv,
                        model_kv,
                        KeyValue::new("error.type", err.error_type()),
                    ],
                );
            }
        }

        result
    }
}

/// Cuts `s` to at most `max` bytes without splitting a char.
fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        s.char_indices()
            .take_while(|&(i, c)| i + c.len_utf8() <= max)
            .map(|(_, c)| c)
            .collect()
    }
}
