use std::time::Instant;

use opentelemetry::KeyValue;

use crate::error::AppResult;
use crate::llm::{LlmClient, ProviderKind};
use crate::prompts::{Language, Stage};
use crate::report::Reporter;
use crate::sentiment::SentimentReading;
use crate::telemetry::metrics::{ANALYSIS_DURATION, ANALYSIS_SENTIMENT_COUNT};

use super::result::{AnalysisResult, AnalysisStatus, StageRecord};
use super::stage::{StageContext, run_stage};

#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub figure_name: String,
    pub provider: ProviderKind,
    pub model: Option<String>,
    pub language: Language,
}

impl AnalysisRequest {
    pub fn new(figure_name: impl Into<String>) -> Self {
        Self {
            figure_name: figure_name.into(),
            provider: ProviderKind::HuggingFace,
            model: None,
            language: Language::En,
        }
    }

    pub fn with_provider(mut self, provider: ProviderKind) -> Self {
        self.provider = provider;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_language(mut self, language: Language) -> Self {
        self.language = language;
        self
    }
}

/// Runs translate (non-English only), describe, then evaluate.
///
/// A failed stage ends the run early with [`AnalysisStatus::Failed`] and an
/// unknown sentiment. Only fatal errors (unknown provider, missing template)
/// are returned as `Err`.
#[tracing::instrument(
    name = "pipeline analyze_figure",
    skip_all,
    fields(
        figure.name = %request.figure_name,
        figure.language = %request.language,
        gen_ai.provider.name = %request.provider,
        gen_ai.request.model,
        analysis.status,
        analysis.sentiment,
        analysis.duration_ms,
    )
)]
pub async fn analyze_figure(
    client: &LlmClient,
    reporter: &mut dyn Reporter,
    request: &AnalysisRequest,
) -> AppResult<AnalysisResult> {
    let start = Instant::now();
    let model = client.resolve_model(request.provider, request.model.as_deref())?;
    tracing::Span::current().record("gen_ai.request.model", model.as_str());

    reporter.header(&request.figure_name, &model, request.language);

    let ctx = StageContext {
        client,
        provider: request.provider,
        model: &model,
        language: request.language,
        figure: &request.figure_name,
    };
    let mut run = Run {
        request,
        model: &model,
        start,
        translated_name: request.figure_name.clone(),
        stages: Vec::with_capacity(3),
    };

    if request.language.needs_translation() {
        let record = run_stage(&ctx, reporter, Stage::Translate, &request.figure_name, "").await?;
        match record.outcome.response() {
            Some(translation) => run.translated_name = translation.trim().to_string(),
            None => return Ok(run.failed(record)),
        }
        run.stages.push(record);
    }

    let name = run.translated_name.clone();

    let description = run_stage(&ctx, reporter, Stage::Describe, &name, "").await?;
    let Some(description_text) = description.outcome.response().map(str::to_string) else {
        return Ok(run.failed(description));
    };
    run.stages.push(description);

    let evaluation =
        run_stage(&ctx, reporter, Stage::Evaluate, &name, &description_text).await?;
    let reading = match evaluation.outcome.response() {
        Some(answer) => SentimentReading::from_response(answer),
        None => return Ok(run.failed(evaluation)),
    };
    run.stages.push(evaluation);

    if !reading.is_known() {
        tracing::info!(
            figure = %request.figure_name,
            "Evaluation answer did not match a sentiment label"
        );
    }
    reporter.sentiment(&request.figure_name, &reading);

    Ok(run.finish(reading, AnalysisStatus::Completed))
}

/// Accumulates stage records for one figure.
struct Run<'a> {
    request: &'a AnalysisRequest,
    model: &'a str,
    start: Instant,
    translated_name: String,
    stages: Vec<StageRecord>,
}

impl Run<'_> {
    fn failed(mut self, record: StageRecord) -> AnalysisResult {
        let stage = record.stage;
        tracing::warn!(
            figure = %self.request.figure_name,
            stage = stage.index(),
            error = record.outcome.text(),
            "Stage failed, stopping analysis"
        );
        self.stages.push(record);
        self.finish(SentimentReading::UNKNOWN, AnalysisStatus::Failed { stage })
    }

    fn finish(self, sentiment: SentimentReading, status: AnalysisStatus) -> AnalysisResult {
        let duration = self.start.elapsed();
        let status_label = match status {
            AnalysisStatus::Completed => "completed",
            AnalysisStatus::Failed { .. } => "failed",
        };

        let span = tracing::Span::current();
        span.record("analysis.status", status_label);
        span.record("analysis.sentiment", sentiment.sentiment.as_str());
        span.record("analysis.duration_ms", duration.as_millis() as u64);

        let provider_kv = KeyValue::new("gen_ai.provider.name", self.request.provider.as_str());
        let language_kv = KeyValue::new("figure.language", self.request.language.as_str());
        ANALYSIS_DURATION.record(
            duration.as_secs_f64(),
            &[
                provider_kv.clone(),
                language_kv.clone(),
                KeyValue::new("analysis.status", status_label),
            ],
        );
        ANALYSIS_SENTIMENT_COUNT.add(
            1,
            &[
                provider_kv,
                language_kv,
                KeyValue::new("analysis.sentiment", sentiment.sentiment.as_str()),
            ],
        );

        AnalysisResult {
            name: self.request.figure_name.clone(),
            language: self.request.language,
            model: self.model.to_string(),
            provider: self.request.provider,
            translated_name: self.translated_name,
            stages: self.stages,
            sentiment,
            status,
            duration_ms: duration.as_millis() as u64,
        }
    }
}
