use std::path::PathBuf;
use thiserror::Error;

pub type TrackerResult<T> = Result<T, TrackerError>;

#[derive(Error, Debug)]
pub enum TrackerError {
    #[error("Workbook not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Spreadsheet engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("Schema mismatch for field {field:?}: {reason}")]
    SchemaMismatch { field: String, reason: String },

    #[error("Invalid range {address:?}: {reason}")]
    InvalidRange { address: String, reason: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Worksheet not found: {0}")]
    SheetNotFound(String),

    /// Engine-level failure reported as text (open, save, closed handle)
    #[error("IO error: {0}")]
    Io(String),

    #[error("File error: {0}")]
    File(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Template error: {0}")]
    Template(String),
}

impl TrackerError {
    pub(crate) fn unknown_field(field: &str) -> Self {
        TrackerError::SchemaMismatch {
            field: field.to_string(),
            reason: "not a Forecast input column".to_string(),
        }
    }

    pub(crate) fn invalid_range(address: &str, reason: impl Into<String>) -> Self {
        TrackerError::InvalidRange {
            address: address.to_string(),
            reason: reason.into(),
        }
    }
}
