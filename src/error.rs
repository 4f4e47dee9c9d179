use std::path::PathBuf;
use thiserror::Error;

/// Errors that end a run before (or instead of) producing a report.
#[derive(Error, Debug)]
pub enum ExamerError {
    #[error("Invalid input path {}: {reason}", .path.display())]
    InvalidInput { path: PathBuf, reason: String },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Report error: {0}")]
    Report(String),
}

impl ExamerError {
    pub fn invalid_input<R: Into<String>>(path: impl Into<PathBuf>, reason: R) -> Self {
        Self::InvalidInput {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn configuration<E: std::fmt::Display>(e: E) -> Self {
        Self::Configuration(e.to_string())
    }
}

/// A source file that could not be turned into units. Scoped to that file.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Failed to parse {}: {message}", .path.display())]
pub struct ParseFailure {
    pub path: PathBuf,
    pub message: String,
}

impl ParseFailure {
    pub fn new<E: std::fmt::Display>(path: impl Into<PathBuf>, e: E) -> Self {
        Self {
            path: path.into(),
            message: e.to_string(),
        }
    }
}

/// The external service failed on a single unit. Scoped to that unit.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Analysis of `{function}` (#{position} in {}, line {line}) failed: {message}", .file.display())]
pub struct AnalysisFailure {
    pub file: PathBuf,
    pub function: String,
    pub position: usize,
    pub line: usize,
    pub message: String,
}

impl AnalysisFailure {
    pub fn new<E: std::fmt::Display>(unit: &crate::extractor::CodeUnit, e: E) -> Self {
        Self {
            file: unit.origin_file.clone(),
            function: unit.name.clone(),
            position: unit.position,
            line: unit.line,
            message: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_input_message_names_the_path() {
        let err = ExamerError::invalid_input("/nope/here", "does not exist");
        assert_eq!(err.to_string(), "Invalid input path /nope/here: does not exist");
    }

    #[test]
    fn parse_failure_keeps_underlying_message() {
        let failure = ParseFailure::new("a.py", "syntax error at 3:1");
        assert_eq!(failure.to_string(), "Failed to parse a.py: syntax error at 3:1");
    }

    #[test]
    fn analysis_failure_points_at_the_source_line() {
        let unit = crate::extractor::CodeUnit {
            origin_file: PathBuf::from("pkg/mod.py"),
            name: "score".to_string(),
            source_text: "def score(x):\n    return x".to_string(),
            position: 2,
            line: 14,
        };
        let failure = AnalysisFailure::new(&unit, "429 Too Many Requests");
        assert_eq!(failure.line, 14);
        assert_eq!(
            failure.to_string(),
            "Analysis of `score` (#2 in pkg/mod.py, line 14) failed: 429 Too Many Requests"
        );
    }
}
