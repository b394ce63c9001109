//! Core error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReplError {
    #[error("Output error: {0}")]
    Output(#[from] replmux_output::OutputError),

    #[error("Session error: {0}")]
    Session(#[from] replmux_session::SessionError),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}
