use clap::Parser;

use figure_sentiment::config::Config;
use figure_sentiment::llm::{LlmClient, ProviderKind};
use figure_sentiment::pipeline::{AnalysisRequest, analyze_figure};
use figure_sentiment::prompts::Language;
use figure_sentiment::report::{MarkdownReporter, NullReporter, Reporter};
use figure_sentiment::telemetry::init_telemetry;

/// Describe public figures with an LLM and classify the sentiment of the description.
#[derive(Debug, Parser)]
#[command(name = "figure-sentiment", version, about)]
struct Cli {
    /// Names of the figures to analyze, one run each.
    #[arg(required = true)]
    figures: Vec<String>,

    /// Backend to query (hf or openai).
    #[arg(short, long, default_value = "hf")]
    provider: ProviderKind,

    /// Model identifier; defaults to the provider's configured model.
    #[arg(short, long)]
    model: Option<String>,

    /// Prompt language (en or cn). Non-English runs translate the name first.
    #[arg(short, long, default_value = "en")]
    language: Language,

    /// Show full prompts and responses instead of truncating them.
    #[arg(short, long)]
    verbose: bool,

    /// Print the result records as JSON instead of Markdown.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::from_env()?;
    config.validate()?;

    let telemetry_guard = init_telemetry(&config)?;

    tracing::info!(
        provider = %cli.provider,
        language = %cli.language,
        figures = cli.figures.len(),
        environment = %config.environment,
        "Starting figure-sentiment"
    );

    let client = LlmClient::from_config(&config)?;

    let mut reporter: Box<dyn Reporter> = if cli.json {
        Box::new(NullReporter)
    } else {
        Box::new(MarkdownReporter::stdout(
            cli.verbose,
            config.display_max_length,
        ))
    };

    let mut records = Vec::with_capacity(cli.figures.len());
    for figure in &cli.figures {
        let mut request = AnalysisRequest::new(figure.as_str())
            .with_provider(cli.provider)
            .with_language(cli.language);
        if let Some(model) = &cli.model {
            request = request.with_model(model.as_str());
        }

        let result = analyze_figure(&client, reporter.as_mut(), &request).await?;
        tracing::info!(
            figure = %result.name,
            sentiment = %result.sentiment(),
            completed = result.is_completed(),
            duration_ms = result.duration_ms,
            "Analysis finished"
        );
        records.push(result.record());
    }

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&records)?);
    }

    telemetry_guard.shutdown();

    Ok(())
}
