//! Session Router
//!
//! Holds every session in a flat arena and resolves which session's console
//! owns a write. Ownership is resolved on every call and never cached, so
//! re-parenting or ending a session takes effect on the next write.

use crate::error::SessionError;
use crate::session::{ReplPolicy, SessionId, SessionNode};
use crate::Result;

#[derive(Debug, Clone, Default)]
pub struct SessionRouter {
    sessions: Vec<SessionNode>,
}

impl SessionRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session; the parent must already be registered
    pub fn add_session(
        &mut self,
        name: String,
        parent: Option<SessionId>,
        repl_policy: Option<ReplPolicy>,
    ) -> Result<SessionId> {
        if name.trim().is_empty() {
            return Err(SessionError::EmptyName);
        }
        if let Some(parent) = parent {
            self.get(parent)?;
        }

        let id = SessionId(self.sessions.len());
        self.sessions
            .push(SessionNode::new(id, name, parent, repl_policy));

        tracing::info!(
            session_id = %id,
            parent = ?parent.map(|p| p.0),
            repl_policy = ?repl_policy,
            "Registered session"
        );

        Ok(id)
    }

    pub fn get(&self, id: SessionId) -> Result<&SessionNode> {
        self.sessions.get(id.0).ok_or(SessionError::NotFound(id))
    }

    fn get_mut(&mut self, id: SessionId) -> Result<&mut SessionNode> {
        self.sessions.get_mut(id.0).ok_or(SessionError::NotFound(id))
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn sessions(&self) -> &[SessionNode] {
        &self.sessions
    }

    /// Re-parent a session. Cycles are not rejected here; they surface as
    /// `CyclicParentChain` when ownership is next resolved.
    pub fn set_parent(&mut self, id: SessionId, parent: Option<SessionId>) -> Result<()> {
        if let Some(parent) = parent {
            self.get(parent)?;
        }
        self.get_mut(id)?.parent = parent;
        Ok(())
    }

    pub fn set_repl_policy(&mut self, id: SessionId, repl_policy: Option<ReplPolicy>) -> Result<()> {
        self.get_mut(id)?.repl_policy = repl_policy;
        Ok(())
    }

    /// Direct children of a session, in registration order
    pub fn children(&self, id: SessionId) -> Vec<SessionId> {
        self.sessions
            .iter()
            .filter(|s| s.parent == Some(id))
            .map(|s| s.id)
            .collect()
    }

    /// Resolve the session whose console owns writes made against `id`
    pub fn resolve(&self, id: SessionId) -> Result<SessionId> {
        let mut current = self.get(id)?;
        let mut hops = 0;

        while !current.has_separate_repl() {
            let Some(parent) = current.parent else {
                break;
            };

            hops += 1;
            if hops > self.sessions.len() {
                tracing::error!(session_id = %id, "Cyclic parent chain in session tree");
                return Err(SessionError::CyclicParentChain(id));
            }

            current = self.get(parent)?;
        }

        Ok(current.id)
    }

    /// Mark a session as ended.
    ///
    /// Returns the still-running children that were merging into it. They are
    /// cut loose from their parent and own their console from now on; the
    /// caller gives each of them a copy of the console they were writing to.
    pub fn end_session(&mut self, id: SessionId) -> Result<Vec<SessionId>> {
        self.get_mut(id)?.end();

        let detached: Vec<SessionId> = self
            .sessions
            .iter()
            .filter(|s| s.parent == Some(id) && !s.is_ended() && !s.has_separate_repl())
            .map(|s| s.id)
            .collect();

        for child in &detached {
            self.get_mut(*child)?.parent = None;
        }

        tracing::info!(
            session_id = %id,
            detached = detached.len(),
            "Session ended"
        );

        Ok(detached)
    }
}
