//! Chatboard core logic.
//!
//! Everything in this crate is synchronous and free of network I/O. The
//! server crate wraps it with real connections.
//!
//! # Components
//!
//! - [`SessionState`]: per-connection authentication state machine
//! - [`processor::process`]: turns one raw line plus session state into an
//!   [`Outcome`] (direct reply, router event, join request or logout)
//! - [`UserStore`]: the credential store interface, with [`MemoryUserStore`]
//!   for tests and embedding
//! - [`SessionEvent`]: what a session asks the router to do

#![forbid(unsafe_code)]

pub mod credential;
pub mod error;
mod event;
pub mod processor;
mod session;
pub mod store;

pub use credential::Credential;
pub use error::{CommandError, CredentialError, SessionError, StoreError};
pub use event::{DepartReason, JoinKind, SessionEvent, SessionId};
pub use processor::{Outcome, process};
pub use session::SessionState;
pub use store::{MemoryUserStore, UserStore};
