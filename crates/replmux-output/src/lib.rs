//! REPLMUX Output
//!
//! Turns streamed console text into the element tree a debug console shows:
//! - Chunks are stitched into logical lines, sealed on newline or severity change
//! - Consecutive identical lines collapse into one element with a repeat count
//! - Groups nest their own elements and are sealed once ended
//! - Expression inputs and structured values sit alongside plain output

mod accumulator;
mod element;
mod error;
mod severity;
mod tree;

pub use accumulator::LineAccumulator;
pub use element::{
    Element, ExpressionElement, GroupElement, OutputLine, SourceLocation, StructuredValue,
    VariableElement,
};
pub use error::OutputError;
pub use severity::Severity;
pub use tree::{ChangeKind, Container, ElementTree, TreeOptions};

pub type Result<T> = std::result::Result<T, OutputError>;
