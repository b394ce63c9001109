//! Session error types

use thiserror::Error;

use crate::session::SessionId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(SessionId),

    #[error("Session name cannot be empty")]
    EmptyName,

    #[error("Cyclic parent chain while resolving the console owner of session {0}")]
    CyclicParentChain(SessionId),
}
