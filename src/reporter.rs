use crate::error::ExamerError;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::Mutex,
};

/// One successfully analyzed function, in the persisted field names.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisRecord {
    #[serde(rename = "file")]
    pub origin_file: String,
    #[serde(rename = "function")]
    pub unit_name: String,
    #[serde(rename = "code")]
    pub source_text: String,
    #[serde(rename = "analysis")]
    pub analysis_text: String,
}

/// The artifact of a run: records in discovery order plus the UTC time they were sealed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisReport {
    #[serde(rename = "analyzed_at")]
    pub generated_at: String,
    #[serde(rename = "results")]
    pub records: Vec<AnalysisRecord>,
}

impl AnalysisReport {
    pub fn new(records: Vec<AnalysisRecord>) -> Self {
        Self {
            generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true),
            records,
        }
    }

    pub fn to_json(&self) -> Result<String, ExamerError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, ExamerError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, ExamerError> {
        Self::from_json(&fs::read_to_string(path)?)
    }
}

/// Destination for a finished report.
pub trait ReportSink: Send + Sync {
    /// Called once per successful unit, in discovery order, as soon as its analysis arrives.
    fn on_record(&self, _record: &AnalysisRecord) {}

    fn emit(&self, report: &AnalysisReport) -> Result<(), ExamerError>;

    /// Human-readable destination, used in the closing summary.
    fn describe(&self) -> String;
}

pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ReportSink for JsonFileSink {
    fn on_record(&self, record: &AnalysisRecord) {
        tracing::info!("{}\n{}", record.unit_name, record.analysis_text);
    }

    fn emit(&self, report: &AnalysisReport) -> Result<(), ExamerError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&self.path, report.to_json()?).map_err(|e| {
            ExamerError::Report(format!("could not write {}: {}", self.path.display(), e))
        })
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Prints each record to stdout as it arrives instead of persisting the report.
#[derive(Default)]
pub struct ConsoleSink {
    current_file: Mutex<Option<String>>,
}

impl ConsoleSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text for one record. A file header is added whenever the file changes.
    pub fn render_record(&self, record: &AnalysisRecord) -> String {
        let mut out = String::new();
        let mut current_file = self
            .current_file
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if current_file.as_deref() != Some(record.origin_file.as_str()) {
            out.push_str(&format!("\n=== {} ===\n", record.origin_file));
            *current_file = Some(record.origin_file.clone());
        }
        out.push_str(&format!("\n--- Function: {} ---\n", record.unit_name));
        out.push_str(&record.analysis_text);
        out.push('\n');
        out
    }
}

impl ReportSink for ConsoleSink {
    fn on_record(&self, record: &AnalysisRecord) {
        print!("{}", self.render_record(record));
    }

    fn emit(&self, report: &AnalysisReport) -> Result<(), ExamerError> {
        if report.records.is_empty() {
            println!("\nNo functions were analyzed successfully.");
        }
        if let Ok(mut current_file) = self.current_file.lock() {
            *current_file = None;
        }
        Ok(())
    }

    fn describe(&self) -> String {
        "console".to_string()
    }
}
