//! Chatboard line protocol.
//!
//! Clients and the server exchange newline-terminated UTF-8 text lines over a
//! byte stream. Client lines are commands (see [`Command`]); server lines are
//! either chat text relayed from another user or system notices prefixed with
//! `Server:` (see [`line`]).
//!
//! # Grammar
//!
//! ```text
//! login <username> <password>
//! newuser <username> <password>
//! send <all|username> <message text...>
//! logout
//! who
//! ```
//!
//! Tokens are separated by ASCII whitespace and the verb is matched
//! case-insensitively. This crate does no I/O.

#![forbid(unsafe_code)]

mod command;
pub mod line;

pub use command::{Command, CommandKind, ParseError, Target};

/// Default TCP port the server listens on.
pub const DEFAULT_PORT: u16 = 10054;

/// Default number of concurrently connected sessions.
pub const DEFAULT_MAX_CLIENTS: usize = 3;

/// Longest accepted line in bytes, excluding the terminator.
pub const MAX_LINE_LENGTH: usize = 4096;

/// Target token that addresses every authenticated session.
pub const BROADCAST_TARGET: &str = "all";

/// Display name of a session that has not authenticated yet.
pub const ANONYMOUS_NAME: &str = "anon";
