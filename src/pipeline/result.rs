use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::error::ProviderError;
use crate::llm::{Completion, ProviderKind};
use crate::prompts::{Language, Stage};
use crate::sentiment::{Sentiment, SentimentReading};

/// Result of one provider call, tagged so failures can't pass for model output.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StageOutcome {
    Success { response: String },
    Failure { error_type: String, message: String },
}

impl StageOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, StageOutcome::Success { .. })
    }

    pub fn response(&self) -> Option<&str> {
        match self {
            StageOutcome::Success { response } => Some(response),
            StageOutcome::Failure { .. } => None,
        }
    }

    /// Response text on success, error message on failure.
    pub fn text(&self) -> &str {
        match self {
            StageOutcome::Success { response } => response,
            StageOutcome::Failure { message, .. } => message,
        }
    }

    pub fn status(&self) -> &'static str {
        match self {
            StageOutcome::Success { .. } => "success",
            StageOutcome::Failure { .. } => "failure",
        }
    }
}

impl From<Result<Completion, ProviderError>> for StageOutcome {
    fn from(result: Result<Completion, ProviderError>) -> Self {
        match result {
            Ok(completion) => StageOutcome::Success {
                response: completion.content,
            },
            Err(err) => StageOutcome::Failure {
                error_type: err.error_type().to_string(),
                message: err.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageRecord {
    pub stage: Stage,
    pub language: Language,
    pub prompt: String,
    pub outcome: StageOutcome,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AnalysisStatus {
    Completed,
    Failed { stage: Stage },
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalysisResult {
    pub name: String,
    pub language: Language,
    pub model: String,
    pub provider: ProviderKind,
    /// Equal to `name` when no translation stage ran.
    pub translated_name: String,
    pub stages: Vec<StageRecord>,
    pub sentiment: SentimentReading,
    pub status: AnalysisStatus,
    pub duration_ms: u64,
}

impl AnalysisResult {
    pub fn stage(&self, stage: Stage) -> Option<&StageRecord> {
        self.stages.iter().find(|r| r.stage == stage)
    }

    pub fn response(&self, stage: Stage) -> Option<&str> {
        self.stage(stage).and_then(|r| r.outcome.response())
    }

    pub fn is_completed(&self) -> bool {
        self.status == AnalysisStatus::Completed
    }

    pub fn sentiment(&self) -> Sentiment {
        self.sentiment.sentiment
    }

    /// Flat record keyed `name`, `language`, `model`, then `stageN_prompt`,
    /// `stageN_response` and `stageN_status` for every stage that ran.
    pub fn record(&self) -> Map<String, Value> {
        let mut record = Map::new();
        record.insert("name".to_string(), json!(self.name));
        record.insert("language".to_string(), json!(self.language));
        record.insert("model".to_string(), json!(self.model));
        record.insert("translated_name".to_string(), json!(self.translated_name));

        for r in &self.stages {
            let i = r.stage.index();
            record.insert(format!("stage{i}_prompt"), json!(r.prompt));
            record.insert(format!("stage{i}_response"), json!(r.outcome.text()));
            record.insert(format!("stage{i}_status"), json!(r.outcome.status()));
        }

        record.insert("sentiment".to_string(), json!(self.sentiment.sentiment));
        record
    }
}
