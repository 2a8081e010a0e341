//! Session registry.
//!
//! The registry maintains two mappings: session → info (every admitted
//! connection) and name → session (authenticated connections only). The name
//! index makes unicast and `who` lookups O(1) and is what enforces unique
//! display names.
//!
//! Only the router driver owns a registry; sessions never touch it.

use std::collections::HashMap;

use chatboard_core::SessionId;

use crate::error::RouterError;

/// Information about a registered session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionInfo {
    /// Display name, set once the session authenticates
    pub name: Option<String>,
}

impl SessionInfo {
    /// Create a new unauthenticated session info.
    pub fn new() -> Self {
        Self { name: None }
    }

    /// Create an authenticated session info.
    pub fn authenticated(name: impl Into<String>) -> Self {
        Self { name: Some(name.into()) }
    }

    /// Whether the session has authenticated.
    pub fn is_authenticated(&self) -> bool {
        self.name.is_some()
    }
}

/// Registry of admitted sessions.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    /// Session ID → session info
    sessions: HashMap<SessionId, SessionInfo>,
    /// Display name → session ID (reverse index). Enforces one session per
    /// name
    names: HashMap<String, SessionId>,
}

impl SessionRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new anonymous session.
    ///
    /// Returns `false` if the session already exists.
    pub fn register_session(&mut self, session_id: SessionId) -> bool {
        if self.sessions.contains_key(&session_id) {
            return false;
        }

        self.sessions.insert(session_id, SessionInfo::new());
        true
    }

    /// Unregister a session, releasing its name.
    ///
    /// Returns the session info if it existed.
    pub fn unregister_session(&mut self, session_id: SessionId) -> Option<SessionInfo> {
        let info = self.sessions.remove(&session_id)?;

        if let Some(name) = &info.name {
            self.names.remove(name);
        }

        Some(info)
    }

    /// Bind `name` to an anonymous session.
    ///
    /// # Errors
    ///
    /// - `SessionNotFound` if the session is not registered
    /// - `AlreadyAuthenticated` if the session already has a name
    /// - `NameInUse` if another session holds `name`
    pub fn authenticate(&mut self, session_id: SessionId, name: &str) -> Result<(), RouterError> {
        let info =
            self.sessions.get(&session_id).ok_or(RouterError::SessionNotFound(session_id))?;

        if info.is_authenticated() {
            return Err(RouterError::AlreadyAuthenticated(session_id));
        }
        if self.names.contains_key(name) {
            return Err(RouterError::NameInUse(name.to_string()));
        }

        self.names.insert(name.to_string(), session_id);
        self.sessions.insert(session_id, SessionInfo::authenticated(name));
        Ok(())
    }

    /// Session metadata. `None` if session doesn't exist.
    pub fn session(&self, session_id: SessionId) -> Option<&SessionInfo> {
        self.sessions.get(&session_id)
    }

    /// Check if a session is registered.
    pub fn has_session(&self, session_id: SessionId) -> bool {
        self.sessions.contains_key(&session_id)
    }

    /// Session authenticated under exactly `name`.
    pub fn session_for_name(&self, name: &str) -> Option<SessionId> {
        self.names.get(name).copied()
    }

    /// All authenticated sessions, in no particular order.
    pub fn authenticated_sessions(&self) -> impl Iterator<Item = SessionId> + '_ {
        self.names.values().copied()
    }

    /// Names of all authenticated sessions, sorted.
    pub fn authenticated_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.names.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Total number of registered sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Number of authenticated sessions.
    pub fn authenticated_count(&self) -> usize {
        self.names.len()
    }
}
