//! Connection Registry
//!
//! Per-connection metadata: which role a connection holds and in which
//! session. Every live connection has an entry from accept until close.

use std::collections::HashMap;

use crate::connection::ConnectionId;
use crate::session::SessionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Unassigned,
    Host,
    Client,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionMeta {
    pub role: Role,
    pub session_id: Option<SessionId>,
}

impl ConnectionMeta {
    fn unassigned() -> Self {
        Self {
            role: Role::Unassigned,
            session_id: None,
        }
    }
}

/// A connection's membership: role plus session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Membership {
    pub role: Role,
    pub session_id: SessionId,
}

#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    entries: HashMap<ConnectionId, ConnectionMeta>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a freshly accepted connection. Returns false if it was already known.
    pub fn register(&mut self, id: &str) -> bool {
        if self.entries.contains_key(id) {
            return false;
        }
        self.entries
            .insert(id.to_string(), ConnectionMeta::unassigned());
        true
    }

    /// Forget a connection entirely.
    pub fn deregister(&mut self, id: &str) -> Option<ConnectionMeta> {
        self.entries.remove(id)
    }

    pub fn get(&self, id: &str) -> Option<&ConnectionMeta> {
        self.entries.get(id)
    }

    pub fn assign(&mut self, id: &str, role: Role, session_id: &str) {
        self.entries.insert(
            id.to_string(),
            ConnectionMeta {
                role,
                session_id: Some(session_id.to_string()),
            },
        );
    }

    /// Reset a connection to unassigned, returning the membership it held.
    pub fn take_membership(&mut self, id: &str) -> Option<Membership> {
        let meta = self.entries.get_mut(id)?;
        let session_id = meta.session_id.take()?;
        let role = std::mem::replace(&mut meta.role, Role::Unassigned);
        Some(Membership { role, session_id })
    }

    pub fn membership(&self, id: &str) -> Option<Membership> {
        let meta = self.entries.get(id)?;
        Some(Membership {
            role: meta.role,
            session_id: meta.session_id.clone()?,
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_starts_unassigned() {
        let mut reg = ConnectionRegistry::new();
        assert!(reg.register("c1"));
        assert!(!reg.register("c1"));
        let meta = reg.get("c1").unwrap();
        assert_eq!(meta.role, Role::Unassigned);
        assert!(meta.session_id.is_none());
        assert!(reg.membership("c1").is_none());
    }

    #[test]
    fn assign_and_take_membership() {
        let mut reg = ConnectionRegistry::new();
        reg.register("c1");
        reg.assign("c1", Role::Host, "s1");
        assert_eq!(
            reg.membership("c1"),
            Some(Membership {
                role: Role::Host,
                session_id: "s1".into()
            })
        );

        let taken = reg.take_membership("c1").unwrap();
        assert_eq!(taken.role, Role::Host);
        assert_eq!(reg.get("c1").unwrap().role, Role::Unassigned);
        // second take finds nothing
        assert!(reg.take_membership("c1").is_none());
    }

    #[test]
    fn take_membership_unknown_connection() {
        let mut reg = ConnectionRegistry::new();
        assert!(reg.take_membership("ghost").is_none());
    }

    #[test]
    fn deregister_removes_entry() {
        let mut reg = ConnectionRegistry::new();
        reg.register("c1");
        reg.register("c2");
        assert_eq!(reg.len(), 2);
        assert!(reg.deregister("c1").is_some());
        assert!(reg.deregister("c1").is_none());
        assert_eq!(reg.len(), 1);
        assert!(!reg.is_empty());
    }
}
