//! Server error types.

use std::fmt;

use chatboard_core::{SessionId, StoreError};
use thiserror::Error;

/// Errors from the router driver.
///
/// Every variant is local to one event: the router logs it (or answers the
/// session's join request with it) and keeps running.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouterError {
    /// Session not found in registry.
    ///
    /// The session departed before its event was processed.
    #[error("session not found: {0}")]
    SessionNotFound(SessionId),

    /// Session already registered. Session IDs are never reused, so this is
    /// a logic bug.
    #[error("session already exists: {0}")]
    SessionAlreadyExists(SessionId),

    /// Another session is authenticated under this name
    #[error("name already in use: {0}")]
    NameInUse(String),

    /// Event requires an authenticated session
    #[error("session {0} is not authenticated")]
    NotAuthenticated(SessionId),

    /// Session tried to authenticate a second time
    #[error("session {0} is already authenticated")]
    AlreadyAuthenticated(SessionId),
}

/// Errors that can occur in the server.
#[derive(Debug)]
pub enum ServerError {
    /// Configuration error (invalid bind address, etc.).
    ///
    /// Fatal: prevents server startup.
    Config(String),

    /// Transport/network error (bind failure, I/O error, etc.).
    Transport(String),

    /// Credential store could not be loaded.
    ///
    /// Fatal: the server does not start serving.
    Store(StoreError),

    /// The router task has stopped; no more connections can be admitted.
    RouterClosed,
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "configuration error: {msg}"),
            Self::Transport(msg) => write!(f, "transport error: {msg}"),
            Self::Store(err) => write!(f, "store error: {err}"),
            Self::RouterClosed => write!(f, "router closed"),
        }
    }
}

impl std::error::Error for ServerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for ServerError {
    fn from(err: StoreError) -> Self {
        Self::Store(err)
    }
}

impl From<std::io::Error> for ServerError {
    fn from(err: std::io::Error) -> Self {
        Self::Transport(err.to_string())
    }
}
