//! Output error types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OutputError {
    #[error("No open group to end")]
    NoOpenGroup,

    #[error("Unknown severity: {0}")]
    UnknownSeverity(String),

    #[error("Open group path no longer resolves to a group")]
    DetachedGroup,
}
