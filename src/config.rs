use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{AppError, AppResult};

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: String,
    pub openai_api_key: Option<String>,
    pub openai_model: String,
    pub openai_max_tokens: u32,
    pub openai_temperature: f32,
    pub openai_base_url: String,
    pub hf_api_key: Option<String>,
    pub hf_model: String,
    pub hf_max_tokens: u32,
    pub hf_temperature: f32,
    pub hf_wait_for_model: bool,
    pub hf_use_cache: bool,
    pub hf_base_url: String,
    pub hf_timeout: Duration,
    pub hf_max_retries: u32,
    pub hf_retry_backoff: Duration,
    pub display_max_length: usize,
    pub otel_service_name: String,
    pub otel_exporter_endpoint: Option<String>,
}

impl Config {
    /// Reads `.env` (when present) and then the process environment.
    pub fn from_env() -> AppResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let string = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());
        let optional = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Ok(Self {
            environment: string("APP_ENVIRONMENT", "development"),
            openai_api_key: optional("OPENAI_API_KEY"),
            openai_model: string("OPENAI_MODEL", "gpt-4o-mini"),
            openai_max_tokens: parse(&lookup, "OPENAI_MAX_TOKENS", 1000)?,
            openai_temperature: parse(&lookup, "OPENAI_TEMPERATURE", 0.7)?,
            openai_base_url: string("OPENAI_BASE_URL", "https://api.openai.com/v1"),
            hf_api_key: optional("HF_API_KEY"),
            hf_model: string("HF_MODEL", "meta-llama/Meta-Llama-3-8B-Instruct"),
            hf_max_tokens: parse(&lookup, "HF_MAX_TOKENS", 1000)?,
            hf_temperature: parse(&lookup, "HF_TEMPERATURE", 0.7)?,
            hf_wait_for_model: flag(&lookup, "HF_WAIT_FOR_MODEL", true),
            hf_use_cache: flag(&lookup, "HF_USE_CACHE", false),
            hf_base_url: string("HF_BASE_URL", "https://api-inference.huggingface.co"),
            hf_timeout: Duration::try_from_secs_f64(parse(&lookup, "HF_TIMEOUT_SECS", 60.0)?)
                .map_err(|e| AppError::Config(format!("HF_TIMEOUT_SECS is out of range: {e}")))?,
            hf_max_retries: parse(&lookup, "HF_MAX_RETRIES", 3)?,
            hf_retry_backoff: Duration::from_millis(parse(&lookup, "HF_RETRY_BACKOFF_MS", 5000)?),
            display_max_length: parse(&lookup, "DISPLAY_MAX_LENGTH", 200)?,
            otel_service_name: string("OTEL_SERVICE_NAME", "figure-sentiment"),
            otel_exporter_endpoint: optional("OTEL_EXPORTER_OTLP_ENDPOINT"),
        })
    }

    /// Fails when either provider credential is missing.
    pub fn validate(&self) -> AppResult<()> {
        if self.openai_api_key.is_none() {
            return Err(AppError::Config("OPENAI_API_KEY is required".to_string()));
        }
        if self.hf_api_key.is_none() {
            return Err(AppError::Config("HF_API_KEY is required".to_string()));
        }
        Ok(())
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

fn parse<F, T>(lookup: &F, key: &str, default: T) -> AppResult<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::Config(format!("{key} must be a number, got {raw:?}"))),
        None => Ok(default),
    }
}

fn flag<F>(lookup: &F, key: &str, default: bool) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|v| v.trim().eq_ignore_ascii_case("true"))
        .unwrap_or(default)
}
