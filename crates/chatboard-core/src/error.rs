//! Error types for the chatboard core.
//!
//! Every error here is recoverable from the connection's point of view: the
//! `Display` text becomes a one-line `Server:` reply to the originating client
//! and the connection stays open. Only I/O failures end a session, and those
//! never pass through these types.

use chatboard_proto::ParseError;
use thiserror::Error;

/// Invalid transition of the session state machine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    /// Transition not allowed from the current state
    #[error("invalid state transition: cannot {operation} from {state}")]
    InvalidTransition {
        /// State name at the time of the attempt
        state: &'static str,
        /// Operation that was attempted
        operation: &'static str,
    },
}

/// Rejected credential registration.
///
/// Each variant has a distinct, stable reply text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    /// Username has 32 or more characters
    #[error("Username must be less than 32 characters.")]
    UsernameTooLong,

    /// Password shorter than 4 or longer than 8 characters
    #[error("Password must be between 4 and 8 characters.")]
    PasswordLength,

    /// Username already present in the store
    #[error("User already exists.")]
    UserExists,

    /// Username collides with the broadcast target
    #[error("Username is reserved.")]
    ReservedName,

    /// Username or password contains a record delimiter
    #[error("Username and password may not contain '(', ')' or ','.")]
    InvalidCharacters,

    /// Backing store could not persist the credential
    #[error("Could not save the new user, please try again later.")]
    Storage(String),
}

/// Failure to load the credential store.
///
/// Fatal at startup: the server does not start serving.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The backing file could not be opened or read
    #[error("credential store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A record did not match the expected format
    #[error("malformed credential record on line {line}: {content:?}")]
    Malformed {
        /// 1-based line number
        line: usize,
        /// Offending line
        content: String,
    },
}

/// Reason a command was refused. Replied to the caller only.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Unknown verb or wrong argument shape
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Command requires an authenticated session
    #[error("Please log in first.")]
    NotLoggedIn,

    /// `login`/`newuser` from an authenticated session
    #[error("You are already logged in.")]
    AlreadyLoggedIn,

    /// Username/password pair does not match the store
    #[error("Authentication failed. Please try again.")]
    AuthenticationFailed,

    /// `newuser` rejected by the store
    #[error(transparent)]
    Credential(#[from] CredentialError),

    /// Another session is already authenticated under this name
    #[error("{0} is already logged in from another session.")]
    NameInUse(String),

    /// Line exceeded the maximum length and was discarded
    #[error("Line too long.")]
    LineTooLong,
}
