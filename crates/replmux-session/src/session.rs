//! Session data structure

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Index of a session in the router's arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub usize);

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where a session's console output goes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ReplPolicy {
    #[default]
    Separate,
    MergeWithParent,
}

impl ReplPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReplPolicy::Separate => "separate",
            ReplPolicy::MergeWithParent => "mergeWithParent",
        }
    }
}

impl std::fmt::Display for ReplPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ReplPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "separate" => Ok(ReplPolicy::Separate),
            "mergeWithParent" => Ok(ReplPolicy::MergeWithParent),
            _ => Err(format!("Unknown repl policy: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionNode {
    pub id: SessionId,
    /// Human-readable name
    pub name: String,
    pub parent: Option<SessionId>,
    /// `None` behaves as `Separate`
    pub repl_policy: Option<ReplPolicy>,
    pub created_at: DateTime<Utc>,
    /// Set once the debug adapter behind the session has gone away
    pub ended_at: Option<DateTime<Utc>>,
}

impl SessionNode {
    pub fn new(
        id: SessionId,
        name: String,
        parent: Option<SessionId>,
        repl_policy: Option<ReplPolicy>,
    ) -> Self {
        Self {
            id,
            name,
            parent,
            repl_policy,
            created_at: Utc::now(),
            ended_at: None,
        }
    }

    pub fn effective_policy(&self) -> ReplPolicy {
        self.repl_policy.unwrap_or_default()
    }

    /// Whether the session writes into a console of its own
    pub fn has_separate_repl(&self) -> bool {
        self.parent.is_none() || self.effective_policy() != ReplPolicy::MergeWithParent
    }

    pub fn is_ended(&self) -> bool {
        self.ended_at.is_some()
    }

    pub fn end(&mut self) {
        if self.ended_at.is_none() {
            self.ended_at = Some(Utc::now());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_separate_repl() {
        let root = SessionNode::new(SessionId(0), "root".to_string(), None, None);
        assert!(root.has_separate_repl());

        let orphan_merge = SessionNode::new(
            SessionId(1),
            "orphan".to_string(),
            None,
            Some(ReplPolicy::MergeWithParent),
        );
        assert!(orphan_merge.has_separate_repl());

        let merged = SessionNode::new(
            SessionId(2),
            "child".to_string(),
            Some(SessionId(0)),
            Some(ReplPolicy::MergeWithParent),
        );
        assert!(!merged.has_separate_repl());

        let unset = SessionNode::new(SessionId(3), "child".to_string(), Some(SessionId(0)), None);
        assert!(unset.has_separate_repl());
        assert_eq!(unset.effective_policy(), ReplPolicy::Separate);
    }

    #[test]
    fn test_policy_round_trip_names() {
        assert_eq!("mergeWithParent".parse::<ReplPolicy>().unwrap(), ReplPolicy::MergeWithParent);
        assert_eq!(ReplPolicy::Separate.to_string(), "separate");
        assert!("merge".parse::<ReplPolicy>().is_err());

        let json = serde_json::to_string(&ReplPolicy::MergeWithParent).unwrap();
        assert_eq!(json, "\"mergeWithParent\"");
    }

    #[test]
    fn test_end_is_sticky() {
        let mut node = SessionNode::new(SessionId(0), "root".to_string(), None, None);
        node.end();
        let first = node.ended_at;
        node.end();
        assert!(node.is_ended());
        assert_eq!(node.ended_at, first);
    }
}
