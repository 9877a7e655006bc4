use crate::error::{AppError, AppResult};
use crate::llm::{GenerateRequest, LlmClient, ProviderKind};
use crate::prompts::{self, Language, Stage};
use crate::report::Reporter;

use super::result::{StageOutcome, StageRecord};

/// Per-run values shared by every stage.
pub struct StageContext<'a> {
    pub client: &'a LlmClient,
    pub provider: ProviderKind,
    pub model: &'a str,
    pub language: Language,
    pub figure: &'a str,
}

/// Renders the stage prompt, sends it, and reports both sides.
///
/// Provider failures are captured in the returned record; only a missing
/// template is an error.
#[tracing::instrument(
    name = "pipeline_stage",
    skip_all,
    fields(
        pipeline.stage = stage.index() as i64,
        stage.status,
    )
)]
pub async fn run_stage(
    ctx: &StageContext<'_>,
    reporter: &mut dyn Reporter,
    stage: Stage,
    name: &str,
    previous_response: &str,
) -> AppResult<StageRecord> {
    let prompt = prompts::render(stage, ctx.language, name, previous_response).ok_or(
        AppError::Template {
            stage,
            language: ctx.language,
        },
    )?;

    reporter.stage_started(stage, ctx.figure);
    reporter.prompt(stage, &prompt);

    let outcome: StageOutcome = ctx
        .client
        .generate(&GenerateRequest {
            provider: ctx.provider,
            model: Some(ctx.model.to_string()),
            prompt: prompt.clone(),
            stage,
        })
        .await
        .into();

    tracing::Span::current().record("stage.status", outcome.status());
    reporter.outcome(stage, &outcome);

    Ok(StageRecord {
        stage,
        language: ctx.language,
        prompt,
        outcome,
    })
}
