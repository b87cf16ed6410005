//! Session Table
//!
//! Authoritative mapping from session id to its host and clients, kept
//! together with the [`ConnectionRegistry`] so both change in one step.
//! Not synchronized by itself: the broker wraps it in a single lock.

use std::collections::HashMap;

use tracing::{debug, info};
use uuid::Uuid;

use crate::connection::{
    ConnectionHandle, ConnectionId, HOST_DISCONNECTED_CODE, HOST_DISCONNECTED_REASON,
};
use crate::registry::{ConnectionRegistry, Membership, Role};

pub type SessionId = String;

#[derive(Debug)]
pub struct Session {
    id: SessionId,
    host: Option<ConnectionHandle>,
    clients: HashMap<ConnectionId, ConnectionHandle>,
}

impl Session {
    fn new(id: SessionId, host: ConnectionHandle) -> Self {
        Self {
            id,
            host: Some(host),
            clients: HashMap::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn host(&self) -> Option<&ConnectionHandle> {
        self.host.as_ref()
    }

    pub fn clients(&self) -> impl Iterator<Item = &ConnectionHandle> {
        self.clients.values()
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    pub fn has_client(&self, id: &str) -> bool {
        self.clients.contains_key(id)
    }

    /// No host and no clients: must not stay in the table.
    pub fn is_abandoned(&self) -> bool {
        self.host.is_none() && self.clients.is_empty()
    }

    /// Host first, then every client.
    pub fn members(&self) -> impl Iterator<Item = &ConnectionHandle> {
        self.host.iter().chain(self.clients.values())
    }
}

/// Outcome of a join attempt.
#[derive(Debug)]
pub enum JoinOutcome {
    /// The client was added; `host` should hear about it.
    Accepted { host: ConnectionHandle },
    Rejected,
}

impl JoinOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, JoinOutcome::Accepted { .. })
    }
}

/// What releasing a connection's membership did to its session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Departure {
    HostLeft {
        session_id: SessionId,
        closed_clients: usize,
    },
    ClientLeft {
        session_id: SessionId,
        session_deleted: bool,
    },
}

#[derive(Debug, Default)]
pub struct SessionTable {
    sessions: HashMap<SessionId, Session>,
    registry: ConnectionRegistry,
}

impl SessionTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Track a freshly accepted connection as unassigned.
    pub fn register_connection(&mut self, id: &str) {
        if !self.registry.register(id) {
            debug!(conn_id = %id, "connection already registered");
        }
    }

    /// Release the connection's membership and forget it. Safe to call twice.
    pub fn deregister_connection(&mut self, id: &str) -> Option<Departure> {
        let departure = self.remove_connection(id);
        self.registry.deregister(id);
        departure
    }

    /// Create a session hosted by `host` and return its id.
    ///
    /// A connection holds at most one role, so any session membership `host`
    /// already has is released first.
    pub fn create_session(&mut self, host: &ConnectionHandle) -> SessionId {
        if let Some(previous) = self.remove_connection(host.id()) {
            debug!(conn_id = %host.id(), ?previous, "released previous membership");
        }
        let id = self.fresh_id();
        self.sessions
            .insert(id.clone(), Session::new(id.clone(), host.clone()));
        self.registry.assign(host.id(), Role::Host, &id);
        info!(session_id = %id, conn_id = %host.id(), "session created");
        id
    }

    /// Add `client` to session `sid` if it exists and has a host other than `client`.
    pub fn join_session(&mut self, sid: &str, client: &ConnectionHandle) -> JoinOutcome {
        let joinable = self
            .sessions
            .get(sid)
            .and_then(Session::host)
            .is_some_and(|host| host.id() != client.id());
        if !joinable {
            return JoinOutcome::Rejected;
        }

        // Cannot delete `sid`: the client is not its host.
        if let Some(previous) = self.remove_connection(client.id()) {
            debug!(conn_id = %client.id(), ?previous, "released previous membership");
        }

        let Some(session) = self.sessions.get_mut(sid) else {
            return JoinOutcome::Rejected;
        };
        let Some(host) = session.host.clone() else {
            return JoinOutcome::Rejected;
        };
        session
            .clients
            .insert(client.id().to_string(), client.clone());
        self.registry.assign(client.id(), Role::Client, sid);
        info!(
            session_id = %sid,
            conn_id = %client.id(),
            clients = session.clients.len(),
            "client joined"
        );
        JoinOutcome::Accepted { host }
    }

    /// Release whatever session role `id` holds.
    ///
    /// A departing host closes every client of its session and the session is
    /// deleted. A departing client leaves; a session left with neither host nor
    /// clients is deleted. No-op for connections without a membership.
    pub fn remove_connection(&mut self, id: &str) -> Option<Departure> {
        let Membership { role, session_id } = self.registry.take_membership(id)?;
        match role {
            Role::Host => {
                let session = self.sessions.remove(&session_id)?;
                let mut closed_clients = 0;
                for client in session.clients.values() {
                    client.close(HOST_DISCONNECTED_CODE, HOST_DISCONNECTED_REASON);
                    self.registry.take_membership(client.id());
                    closed_clients += 1;
                }
                info!(session_id = %session_id, closed_clients, "host left, session closed");
                Some(Departure::HostLeft {
                    session_id,
                    closed_clients,
                })
            }
            Role::Client => {
                let session = self.sessions.get_mut(&session_id)?;
                session.clients.remove(id);
                let session_deleted = session.is_abandoned();
                if session_deleted {
                    self.sessions.remove(&session_id);
                }
                info!(session_id = %session_id, conn_id = %id, session_deleted, "client left");
                Some(Departure::ClientLeft {
                    session_id,
                    session_deleted,
                })
            }
            Role::Unassigned => None,
        }
    }

    pub fn get(&self, sid: &str) -> Option<&Session> {
        self.sessions.get(sid)
    }

    pub fn contains(&self, sid: &str) -> bool {
        self.sessions.contains_key(sid)
    }

    /// Everyone a params update for `sid` goes to.
    pub fn recipients(&self, sid: &str) -> Option<Vec<ConnectionHandle>> {
        self.sessions
            .get(sid)
            .map(|session| session.members().cloned().collect())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    fn fresh_id(&self) -> SessionId {
        loop {
            let id = Uuid::new_v4().to_string();
            if !self.sessions.contains_key(&id) {
                return id;
            }
        }
    }
}

#[cfg(test)]
impl SessionTable {
    /// Drop a session's host without tearing it down, leaving a client-only session.
    pub(crate) fn detach_host_for_test(&mut self, sid: &str) {
        if let Some(session) = self.sessions.get_mut(sid) {
            if let Some(host) = session.host.take() {
                self.registry.take_membership(host.id());
            }
        }
    }
}
