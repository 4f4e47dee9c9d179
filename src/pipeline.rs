use crate::{
    analyzer::UnitAnalyzer,
    config::Config,
    error::{AnalysisFailure, ExamerError},
    extractor::{CodeUnit, UnitExtractor},
    file_discovery::FileDiscovery,
    reporter::{AnalysisRecord, AnalysisReport, ReportSink},
};
use futures::stream::{self, StreamExt};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct RunOptions {
    /// Upper bound on analyzer calls in flight at once.
    pub concurrency: usize,
    pub max_retries: u32,
    pub retry_backoff: Duration,
    pub call_timeout: Duration,
}

impl RunOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            concurrency: config.analysis.concurrency.max(1),
            max_retries: config.analysis.max_retries,
            retry_backoff: Duration::from_millis(config.analysis.retry_backoff_ms),
            call_timeout: Duration::from_secs(config.llm.timeout_seconds + 5),
        }
    }
}

impl Default for RunOptions {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Counters for one run. Not part of the persisted report.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub files_discovered: usize,
    pub files_skipped: usize,
    pub walk_errors: usize,
    pub units_found: usize,
    pub units_analyzed: usize,
    pub units_failed: usize,
}

impl RunSummary {
    pub fn print_summary(&self) {
        println!("Run Summary:");
        println!("  Files discovered: {}", self.files_discovered);
        println!("  Files skipped (parse errors): {}", self.files_skipped);
        if self.walk_errors > 0 {
            println!("  Unreadable directory entries: {}", self.walk_errors);
        }
        println!("  Functions found: {}", self.units_found);
        println!("  Functions analyzed: {}", self.units_analyzed);
        println!("  Functions failed: {}", self.units_failed);
    }
}

/// Drives discovery, extraction and analysis, then hands the report to its sink.
///
/// Parse failures skip a file and analysis failures skip a unit; neither stops the run.
/// Records come out in discovery order whatever the concurrency.
pub struct BatchOrchestrator {
    discovery: FileDiscovery,
    extractor: UnitExtractor,
    analyzer: Arc<dyn UnitAnalyzer>,
    sink: Box<dyn ReportSink>,
    options: RunOptions,
}

impl BatchOrchestrator {
    pub fn new(config: &Config, analyzer: Arc<dyn UnitAnalyzer>, sink: Box<dyn ReportSink>) -> Self {
        Self {
            discovery: FileDiscovery::new(config),
            extractor: UnitExtractor::new(config.analysis.include_decorators),
            analyzer,
            sink,
            options: RunOptions::from_config(config),
        }
    }

    pub fn with_options(mut self, options: RunOptions) -> Self {
        self.options = options;
        self
    }

    pub fn sink(&self) -> &dyn ReportSink {
        self.sink.as_ref()
    }

    pub async fn run(&self, root: &Path) -> Result<(AnalysisReport, RunSummary), ExamerError> {
        let files = self.discovery.discover(root)?;
        let mut summary = RunSummary::default();

        let units = files.flat_map(|entry| {
            let path = match entry {
                Ok(path) => path,
                Err(e) => {
                    warn!("Skipping unreadable entry: {}", e);
                    summary.walk_errors += 1;
                    return Vec::new();
                }
            };
            summary.files_discovered += 1;
            info!("=== Analyzing {} ===", path.display());

            match self.extractor.extract(&path) {
                Ok(units) => {
                    debug!("{} functions in {}", units.len(), path.display());
                    summary.units_found += units.len();
                    units
                }
                Err(failure) => {
                    warn!("{}", failure);
                    summary.files_skipped += 1;
                    Vec::new()
                }
            }
        });

        let mut outcomes = stream::iter(units)
            .map(|unit| self.analyze_unit(unit))
            .buffered(self.options.concurrency.max(1));

        let mut records = Vec::new();
        let mut failed = 0;
        while let Some((unit, outcome)) = outcomes.next().await {
            match outcome {
                Ok(analysis_text) => {
                    let record = AnalysisRecord {
                        origin_file: unit.origin_file.to_string_lossy().to_string(),
                        unit_name: unit.name,
                        source_text: unit.source_text,
                        analysis_text,
                    };
                    self.sink.on_record(&record);
                    records.push(record);
                }
                Err(_) => failed += 1,
            }
        }
        drop(outcomes);
        summary.units_analyzed = records.len();
        summary.units_failed = failed;

        let report = AnalysisReport::new(records);
        self.sink.emit(&report)?;
        info!(
            "Report with {} records written to {}",
            report.records.len(),
            self.sink.describe()
        );

        Ok((report, summary))
    }

    async fn analyze_unit(&self, unit: CodeUnit) -> (CodeUnit, Result<String, AnalysisFailure>) {
        info!("--- Function: {} (line {}) ---", unit.name, unit.line);

        let mut attempt = 0;
        let outcome = loop {
            let result = match tokio::time::timeout(self.options.call_timeout, self.analyzer.analyze(&unit)).await {
                Ok(result) => result,
                Err(_) => Err(AnalysisFailure::new(
                    &unit,
                    format!("timed out after {:?}", self.options.call_timeout),
                )),
            };

            match result {
                Ok(text) => break Ok(text),
                Err(failure) if attempt < self.options.max_retries => {
                    attempt += 1;
                    debug!("Retrying {} (attempt {}): {}", unit.id(), attempt + 1, failure.message);
                    tokio::time::sleep(self.options.retry_backoff * attempt).await;
                }
                Err(failure) => break Err(failure),
            }
        };

        if let Err(failure) = &outcome {
            warn!("{}", failure);
        }
        (unit, outcome)
    }
}
