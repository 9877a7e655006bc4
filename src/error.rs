use thiserror::Error;

use crate::prompts::{Language, Stage};

/// Fatal errors. Any of these stops the process before or outside a pipeline run.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unsupported provider: {0}")]
    UnsupportedProvider(String),

    #[error("No prompt template for stage {stage} in language {language}")]
    Template { stage: Stage, language: Language },

    #[error("Telemetry error: {0}")]
    Telemetry(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type AppResult<T> = Result<T, AppError>;

/// Outcome of a failed provider call.
///
/// Provider failures never escape the pipeline as [`AppError`]; they are
/// recorded on the stage that produced them.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    #[error("service temporarily unavailable (HTTP {status})")]
    TransientUnavailable { status: u16 },

    #[error("model unavailable after {attempts} attempts")]
    RetriesExhausted { attempts: u32 },

    #[error("request timed out")]
    Timeout,

    #[error("provider returned an empty response")]
    EmptyResponse,

    #[error("error generating response: {0}")]
    Unknown(String),
}

impl ProviderError {
    /// Stable tag used for span attributes, metric labels and serialized records.
    pub fn error_type(&self) -> &'static str {
        match self {
            ProviderError::TransientUnavailable { .. } => "transient_unavailable",
            ProviderError::RetriesExhausted { .. } => "retries_exhausted",
            ProviderError::Timeout => "timeout",
            ProviderError::EmptyResponse => "empty_response",
            ProviderError::Unknown(_) => "unknown_error",
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, ProviderError::TransientUnavailable { .. })
    }
}
