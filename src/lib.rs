pub mod config;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod prompts;
pub mod report;
pub mod sentiment;
pub mod telemetry;

pub use config::Config;
pub use error::{AppError, AppResult, ProviderError};
pub use pipeline::{AnalysisRequest, AnalysisResult, analyze_figure};
