pub mod client;
pub mod huggingface;
pub mod openai;
pub mod retry;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

pub use client::{GenerateRequest, LlmClient};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    OpenAi,
    HuggingFace,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::HuggingFace => "huggingface",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "openai" | "openai_provider" => Ok(ProviderKind::OpenAi),
            "hf" | "huggingface" | "hf_provider" => Ok(ProviderKind::HuggingFace),
            other => Err(format!("unsupported provider: {other}")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Completion {
    pub content: String,
    pub model: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub finish_reason: String,
}

/// A chat backend that answers a single user-role prompt.
///
/// `model` overrides [`Provider::default_model`] for one call.
#[async_trait::async_trait]
pub trait Provider: Send + Sync {
    async fn generate(&self, prompt: &str, model: Option<&str>)
    -> Result<Completion, ProviderError>;
    fn name(&self) -> &str;
    fn default_model(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_kind_aliases() {
        let cases = vec![
            ("openai", ProviderKind::OpenAi),
            ("openai_provider", ProviderKind::OpenAi),
            ("hf", ProviderKind::HuggingFace),
            ("HuggingFace", ProviderKind::HuggingFace),
            ("hf_provider", ProviderKind::HuggingFace),
        ];
        for (input, expected) in cases {
            assert_eq!(input.parse::<ProviderKind>().unwrap(), expected, "{input}");
        }
        assert!("anthropic".parse::<ProviderKind>().is_err());
    }
}
