//! Presentation of a pipeline run. The driver only talks to [`Reporter`];
//! [`MarkdownReporter`] renders the run as Markdown text.

use std::io::Write;

use crate::pipeline::StageOutcome;
use crate::prompts::{Language, Stage};
use crate::sentiment::SentimentReading;

pub trait Reporter: Send {
    fn header(&mut self, name: &str, model: &str, language: Language);
    fn stage_started(&mut self, stage: Stage, figure: &str);
    fn prompt(&mut self, stage: Stage, text: &str);
    fn outcome(&mut self, stage: Stage, outcome: &StageOutcome);
    fn sentiment(&mut self, figure: &str, reading: &SentimentReading);
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn header(&mut self, _name: &str, _model: &str, _language: Language) {}
    fn stage_started(&mut self, _stage: Stage, _figure: &str) {}
    fn prompt(&mut self, _stage: Stage, _text: &str) {}
    fn outcome(&mut self, _stage: Stage, _outcome: &StageOutcome) {}
    fn sentiment(&mut self, _figure: &str, _reading: &SentimentReading) {}
}

pub struct MarkdownReporter<W: Write + Send> {
    writer: W,
    verbose: bool,
    max_length: usize,
}

impl MarkdownReporter<std::io::Stdout> {
    pub fn stdout(verbose: bool, max_length: usize) -> Self {
        Self::new(std::io::stdout(), verbose, max_length)
    }
}

impl<W: Write + Send> MarkdownReporter<W> {
    pub fn new(writer: W, verbose: bool, max_length: usize) -> Self {
        Self {
            writer,
            verbose,
            max_length,
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn shown(&self, text: &str) -> String {
        if self.verbose {
            text.to_string()
        } else {
            truncate_response(text, self.max_length)
        }
    }

    fn line(&mut self, text: &str) {
        // Best-effort; write failures are logged and dropped.
        if let Err(e) = writeln!(self.writer, "{text}\n") {
            tracing::debug!(error = %e, "Failed to write report line");
        }
    }
}

impl<W: Write + Send> Reporter for MarkdownReporter<W> {
    fn header(&mut self, name: &str, model: &str, language: Language) {
        self.line(&format!("### Analyzing **{name}**"));
        let model = if model.is_empty() { "default" } else { model };
        self.line(&format!(
            "*Model: {model} | Language: {}*",
            language.as_str().to_uppercase()
        ));
    }

    fn stage_started(&mut self, stage: Stage, figure: &str) {
        let heading = match stage {
            Stage::Translate => format!("#### 🀄 Step 0: Translating {figure} into Chinese"),
            Stage::Describe => format!("#### 📝 Step 1: Describing {figure}"),
            Stage::Evaluate => format!("#### ⚖️ Step 2: Evaluating sentiment for {figure}"),
        };
        self.line(&heading);
    }

    fn prompt(&mut self, _stage: Stage, text: &str) {
        let shown = self.shown(text);
        self.line(&format!("**Prompt:** {shown}"));
    }

    fn outcome(&mut self, stage: Stage, outcome: &StageOutcome) {
        let rendered = match outcome {
            StageOutcome::Success { response } => {
                format!("**{}:** {}", stage.response_prefix(), self.shown(response))
            }
            StageOutcome::Failure {
                error_type,
                message,
            } => format!("**Error ({error_type}):** {message}"),
        };
        self.line(&rendered);
    }

    fn sentiment(&mut self, figure: &str, reading: &SentimentReading) {
        self.line(&format!("#### ✅ Sentiment evaluation for {figure}"));
        self.line(&format!(
            "**Sentiment**: <span style='color:{}'>{}</span>",
            reading.color(),
            reading.label()
        ));
    }
}

/// Shortens `response` to at most `max_length` characters plus `...`.
///
/// The cut backs off to the last whitespace so words stay whole. Text with no
/// whitespace in the kept prefix (e.g. CJK) is cut at the character limit.
pub fn truncate_response(response: &str, max_length: usize) -> String {
    if response.chars().count() <= max_length {
        return response.to_string();
    }

    let cut = response
        .char_indices()
        .nth(max_length)
        .map(|(i, _)| i)
        .unwrap_or(response.len());
    let prefix = &response[..cut];

    let next_is_space = response[cut..]
        .chars()
        .next()
        .is_some_and(char::is_whitespace);

    let kept = if next_is_space {
        prefix
    } else {
        match prefix.rfind(char::is_whitespace) {
            Some(i) => &prefix[..i],
            None => prefix,
        }
    };

    format!("{}...", kept.trim_end())
}
