//! REPLMUX Session Routing
//!
//! Debug sessions form a tree: a launch can spawn child sessions, which can
//! spawn their own. Each session either keeps a console of its own or merges
//! its output into its parent's console:
//! - A session without a parent always owns its console
//! - `separate` (or no policy at all) owns its console
//! - `mergeWithParent` writes into whatever console its parent resolves to

mod error;
mod router;
mod session;

pub use error::SessionError;
pub use router::SessionRouter;
pub use session::{ReplPolicy, SessionId, SessionNode};

pub type Result<T> = std::result::Result<T, SessionError>;
