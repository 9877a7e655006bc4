pub mod orchestrator;
pub mod result;
pub mod stage;

pub use orchestrator::{AnalysisRequest, analyze_figure};
pub use result::{AnalysisResult, AnalysisStatus, StageOutcome, StageRecord};
