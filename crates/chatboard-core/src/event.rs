//! Events a session hands to the router.

use chatboard_proto::Target;

/// Router-assigned identifier of one connection.
pub type SessionId = u64;

/// How a session obtained its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    /// `login` with existing credentials
    Login,
    /// `newuser` registered the credentials first
    Registration,
}

/// Why a session is leaving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DepartReason {
    /// Client issued `logout`
    Logout,
    /// Read or write failed, or the peer closed the stream
    Disconnected,
    /// Outbound queue filled up; the session was too slow to drain it
    Overflow,
}

impl DepartReason {
    /// Short description for logs.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Logout => "logout",
            Self::Disconnected => "disconnected",
            Self::Overflow => "outbound queue full",
        }
    }
}

/// Session-originated request processed by the router.
///
/// Events are keyed by the session that emitted them; the router resolves
/// display names from its registry, never from the event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Credentials were accepted; claim `name` in the registry
    Joined {
        /// Name to register
        name: String,
        /// Login or registration, selects the welcome text
        kind: JoinKind,
    },
    /// Relay `text` to `target`
    Message {
        /// Broadcast or a single named session
        target: Target,
        /// Message body
        text: String,
    },
    /// Remove the session from the registry
    Departed {
        /// Why the session is leaving
        reason: DepartReason,
    },
    /// Reply with the authenticated names
    Who,
}
