//! Console configuration

use serde::{Deserialize, Serialize};
use std::path::Path;

use replmux_output::TreeOptions;

use crate::error::ReplError;
use crate::Result;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplConfig {
    /// Fold consecutive identical lines into one element with a count
    pub collapse_identical_lines: bool,
    /// Maximum number of top-level elements kept per console
    pub max_elements: usize,
    /// Initial filter query, e.g. `"error, !noise"`
    pub filter_query: String,
}

impl ReplConfig {
    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_elements == 0 {
            return Err(ReplError::Config(
                "max_elements must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn tree_options(&self) -> TreeOptions {
        TreeOptions {
            collapse_identical_lines: self.collapse_identical_lines,
            max_elements: self.max_elements,
        }
    }
}

impl Default for ReplConfig {
    fn default() -> Self {
        Self {
            collapse_identical_lines: true,
            max_elements: 10_000,
            filter_query: String::new(),
        }
    }
}
