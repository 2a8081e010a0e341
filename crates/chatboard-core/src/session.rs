//! Per-connection session state machine.
//!
//! ```text
//! ┌───────────┐  login/newuser   ┌───────────────┐
//! │ Anonymous │─────────────────>│ Authenticated │
//! └───────────┘                  └───────────────┘
//!       │                                │
//!       │ I/O failure                    │ logout / I/O failure
//!       ↓                                ↓
//!  ┌────────────┐                  ┌────────────┐
//!  │ Terminated │                  │ Terminated │
//!  └────────────┘                  └────────────┘
//! ```
//!
//! Terminated is absorbing: no further commands are processed.

use chatboard_proto::ANONYMOUS_NAME;

use crate::error::SessionError;

/// Authentication state of one connection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SessionState {
    /// Connected, not yet authenticated
    #[default]
    Anonymous,
    /// Authenticated under `name`
    Authenticated {
        /// Display name, unique among authenticated sessions
        name: String,
    },
    /// Logged out or failed; nothing more is processed
    Terminated,
}

impl SessionState {
    /// Fresh anonymous session.
    pub fn new() -> Self {
        Self::Anonymous
    }

    /// Name shown to other users. The anonymous placeholder until
    /// authenticated.
    pub fn display_name(&self) -> &str {
        match self {
            Self::Authenticated { name } => name,
            Self::Anonymous | Self::Terminated => ANONYMOUS_NAME,
        }
    }

    /// Whether the session has authenticated and not terminated.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated { .. })
    }

    /// Whether the session has terminated.
    pub fn is_terminated(&self) -> bool {
        matches!(self, Self::Terminated)
    }

    /// Move from Anonymous to Authenticated.
    pub fn authenticate(&mut self, name: impl Into<String>) -> Result<(), SessionError> {
        match self {
            Self::Anonymous => {
                *self = Self::Authenticated { name: name.into() };
                Ok(())
            },
            Self::Authenticated { .. } | Self::Terminated => {
                Err(SessionError::InvalidTransition { state: self.state_name(), operation: "authenticate" })
            },
        }
    }

    /// Move to Terminated. Idempotent.
    pub fn terminate(&mut self) {
        *self = Self::Terminated;
    }

    fn state_name(&self) -> &'static str {
        match self {
            Self::Anonymous => "Anonymous",
            Self::Authenticated { .. } => "Authenticated",
            Self::Terminated => "Terminated",
        }
    }
}
