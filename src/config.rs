//! YAML configuration
//!
//! ```yaml
//! engine: xlsx
//! inspect_sample_rows: 5
//! layout:
//!   input_sheet: Forecast input
//!   output_sheet: Sales forecast
//!   header_row: 6
//!   data_start_row: 7
//! ```
//!
//! Every key is optional; a missing file section falls back to the stock
//! tracker layout.

use crate::error::{TrackerError, TrackerResult};
use crate::layout::SheetLayout;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrackerConfig {
    /// Spreadsheet engine name (see `excel::engine::by_name`)
    pub engine: String,
    /// Data rows shown per sheet by `inspect`
    pub inspect_sample_rows: u32,
    pub layout: SheetLayout,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            engine: "xlsx".to_string(),
            inspect_sample_rows: 5,
            layout: SheetLayout::default(),
        }
    }
}

impl TrackerConfig {
    pub fn from_yaml(content: &str) -> TrackerResult<Self> {
        let config: TrackerConfig = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> TrackerResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            TrackerError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config = Self::from_yaml(&content)?;
        debug!(path = %path.display(), engine = %config.engine, "loaded configuration");
        Ok(config)
    }

    /// Load from `path` when given, defaults otherwise
    pub fn load_or_default(path: Option<&Path>) -> TrackerResult<Self> {
        match path {
            Some(p) => Self::load(p),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> TrackerResult<()> {
        if self.engine.trim().is_empty() {
            return Err(TrackerError::Config("engine must not be empty".to_string()));
        }
        self.layout.validate()
    }
}
