//! REPLMUX Core
//!
//! The debug console behind a multi-session debugger. Sessions write output,
//! open and close groups and submit expressions; every write is routed to the
//! console model that owns the session, and every change is announced on
//! that model's change stream.

mod config;
mod console;
mod error;
mod evaluator;
mod event;
mod model;

pub use config::ReplConfig;
pub use console::ReplConsole;
pub use error::ReplError;
pub use evaluator::{
    EvaluationBackend, EvaluationRequest, EvaluationResult, ExpressionEvaluator, StackFrameRef,
};
pub use event::{OutputEvent, OutputGroup};
pub use model::{OutputData, ReplChange, ReplModel};

// Re-export the building blocks
pub use replmux_filter::{FilterAction, FilterTerm, ReplFilter};
pub use replmux_output::{
    ChangeKind, Element, ExpressionElement, GroupElement, OutputError, OutputLine, Severity,
    SourceLocation, StructuredValue, VariableElement,
};
pub use replmux_session::{ReplPolicy, SessionError, SessionId, SessionNode, SessionRouter};

pub type Result<T> = std::result::Result<T, ReplError>;

/// Initialize logging
pub fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    fmt().with_env_filter(filter).with_target(true).init();
}
