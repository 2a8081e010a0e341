//! Command processor.
//!
//! Translates one raw protocol line plus the caller's [`SessionState`] into an
//! [`Outcome`]. The processor never mutates the session and never talks to the
//! router; the session actor applies the outcome. The only side effect is a
//! credential registration through the [`UserStore`] for `newuser`.
//!
//! # Gating order
//!
//! 1. Terminated sessions are ignored
//! 2. Unknown verb → `Command not found.`
//! 3. Verb needs auth and session is anonymous → `Please log in first.`
//! 4. `login`/`newuser` from an authenticated session → `You are already
//!    logged in.`
//! 5. Wrong argument shape → usage reply
//! 6. Credential checks

use chatboard_proto::{Command, ParseError};

use crate::{
    error::CommandError,
    event::{JoinKind, SessionEvent},
    session::SessionState,
    store::UserStore,
};

/// Result of processing one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Refusal replied to the caller only; no state change
    Reject(CommandError),
    /// Credentials accepted. The router must admit `name` before the session
    /// counts as authenticated.
    Join {
        /// Name to claim
        name: String,
        /// Login or registration
        kind: JoinKind,
    },
    /// Hand an event to the router
    Forward(SessionEvent),
    /// Emit a departure and terminate the session
    Logout,
    /// Session already terminated; nothing happens
    Ignore,
}

/// Process one raw line for a session in `state`.
pub fn process<S: UserStore>(state: &SessionState, line: &str, store: &S) -> Outcome {
    if state.is_terminated() {
        return Outcome::Ignore;
    }

    let parsed = Command::parse(line);
    let kind = match &parsed {
        Ok(command) => command.kind(),
        Err(ParseError::Usage(kind)) => *kind,
        Err(err @ ParseError::UnknownCommand(_)) => return Outcome::Reject(err.clone().into()),
    };

    if kind.requires_auth() && !state.is_authenticated() {
        return Outcome::Reject(CommandError::NotLoggedIn);
    }
    if !kind.requires_auth() && state.is_authenticated() {
        return Outcome::Reject(CommandError::AlreadyLoggedIn);
    }

    let command = match parsed {
        Ok(command) => command,
        Err(err) => return Outcome::Reject(err.into()),
    };

    match command {
        Command::Login { username, password } => {
            if store.verify(&username, &password) {
                Outcome::Join { name: username, kind: JoinKind::Login }
            } else {
                tracing::debug!(%username, "login rejected: bad credentials");
                Outcome::Reject(CommandError::AuthenticationFailed)
            }
        },
        Command::NewUser { username, password } => match store.append(&username, &password) {
            Ok(()) => {
                tracing::info!(%username, "registered new user");
                Outcome::Join { name: username, kind: JoinKind::Registration }
            },
            Err(err) => {
                tracing::debug!(%username, error = %err, "registration rejected");
                Outcome::Reject(err.into())
            },
        },
        Command::Send { target, text } => Outcome::Forward(SessionEvent::Message { target, text }),
        Command::Who => Outcome::Forward(SessionEvent::Who),
        Command::Logout => Outcome::Logout,
    }
}
