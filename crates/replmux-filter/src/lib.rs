//! REPLMUX Console Filter
//!
//! Query language for hiding console output:
//! - `error, warn` shows output containing either term
//! - `!noise` hides output containing the term
//! - `\!literal` matches a term that starts with `!`
//!
//! Matching is case-insensitive substring matching. Groups, expressions and
//! structured values are never hidden.

mod filter;

pub use filter::{FilterAction, FilterTerm, ReplFilter};
