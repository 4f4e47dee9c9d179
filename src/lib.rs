pub mod config;
pub mod error;
pub mod file_discovery;
pub mod syntax;
pub mod extractor;
pub mod llm;
pub mod analyzer;
pub mod reporter;
pub mod pipeline;

pub use config::Config;
pub use error::{AnalysisFailure, ExamerError, ParseFailure};
pub use file_discovery::FileDiscovery;
pub use extractor::{CodeUnit, UnitExtractor};
pub use llm::LLMClient;
pub use analyzer::{PatentAnalyzer, UnitAnalyzer};
pub use reporter::{AnalysisRecord, AnalysisReport, ConsoleSink, JsonFileSink, ReportSink};
pub use pipeline::{BatchOrchestrator, RunOptions, RunSummary};

pub type Result<T> = anyhow::Result<T>;
