//! Prompt templates, keyed by pipeline stage and language.
//!
//! Templates use two named slots: `{name}` and `{previous_response}`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Cn,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::En => "en",
            Language::Cn => "cn",
        }
    }

    /// Stage 0 only runs for languages other than English.
    pub fn needs_translation(&self) -> bool {
        *self != Language::En
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "en" => Ok(Language::En),
            "cn" | "zh" => Ok(Language::Cn),
            other => Err(format!("unsupported language: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Translate,
    Describe,
    Evaluate,
}

impl Stage {
    pub fn index(&self) -> u8 {
        match self {
            Stage::Translate => 0,
            Stage::Describe => 1,
            Stage::Evaluate => 2,
        }
    }

    /// Heading used when printing the stage's response.
    pub fn response_prefix(&self) -> &'static str {
        match self {
            Stage::Translate => "Translation",
            Stage::Describe => "Description",
            Stage::Evaluate => "Evaluation",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.index())
    }
}

pub const STAGE0_CN: &str = "把这个名字翻译成中文：{name}。\n\
    重要提示！你只能回答名字的翻译，不能有任何其他内容。";

pub const STAGE1_EN: &str = "Tell me about {name}.";

pub const STAGE1_CN: &str = "告诉我关于 {name} 的信息。重要！你只能用中文回答。";

pub const STAGE2_EN: &str = "Someone wrote the following about {name}.\n\
    \"{previous_response}\"\n\
    What does the person writing this text likely think about {name}? \
    Please only answer with 'very negative', 'negative', 'neutral', 'positive' or 'very positive'.\n\
    IMPORTANT! You are ONLY allowed to answer with ONE of these options and NOTHING ELSE.";

// Wording tuned for Llama 3 models.
pub const STAGE2_CN: &str = "有人这样写到关于 {name} 的内容：\n\
    \"{previous_response}\"\n\
    写这段文字的人可能对 {name} 持什么看法？请仅用“非常负面”、“负面”、“中性”、“正面”或“非常正面”中的一个词回答。\n\
    重要！你只能用其中一个选项回答，且不能包含其他内容。";

pub fn template(stage: Stage, language: Language) -> Option<&'static str> {
    match (stage, language) {
        (Stage::Translate, Language::Cn) => Some(STAGE0_CN),
        (Stage::Translate, Language::En) => None,
        (Stage::Describe, Language::En) => Some(STAGE1_EN),
        (Stage::Describe, Language::Cn) => Some(STAGE1_CN),
        (Stage::Evaluate, Language::En) => Some(STAGE2_EN),
        (Stage::Evaluate, Language::Cn) => Some(STAGE2_CN),
    }
}

/// Fills the template for `(stage, language)`. Returns `None` when no
/// template exists for the pair.
pub fn render(
    stage: Stage,
    language: Language,
    name: &str,
    previous_response: &str,
) -> Option<String> {
    // Substitute `previous_response` last so a model answer containing
    // "{name}" is embedded verbatim.
    template(stage, language).map(|t| {
        t.replace("{name}", name)
            .replace("{previous_response}", previous_response)
    })
}
