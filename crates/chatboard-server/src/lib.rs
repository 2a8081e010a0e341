//! Chatboard relay server.
//!
//! Clients connect over TCP, authenticate, and exchange broadcast or directed
//! text lines through a single router task.
//!
//! # Architecture
//!
//! ```text
//! socket ─> session reader ─> command processor ─> router ─> outbound queues ─> session writers ─> sockets
//! ```
//!
//! - [`RouterDriver`]: action-based router logic and the session registry
//!   (pure, no I/O)
//! - [`spawn_router`] / [`RouterHandle`]: the router task that executes
//!   driver actions and owns every session's outbound queue
//! - Session actors: one reader and one writer task per connection
//! - [`Server`]: TCP listener that gates `accept` on the session limit
//! - [`FileUserStore`]: credentials persisted to a text file

#![forbid(unsafe_code)]

mod driver;
mod error;
mod file_store;
mod registry;
mod router;
mod session;

use std::{net::SocketAddr, path::PathBuf};

use chatboard_core::UserStore;
use chatboard_proto::DEFAULT_PORT;
pub use driver::{
    CloseReason, DEFAULT_OUTBOUND_CAPACITY, LogLevel, RouterAction, RouterConfig, RouterDriver,
    RouterEvent,
};
pub use error::{RouterError, ServerError};
pub use file_store::{FileUserStore, format_record, parse_record};
pub use registry::{SessionInfo, SessionRegistry};
pub use router::{RouterHandle, spawn_router};
use tokio::net::{TcpListener, TcpStream};

/// Server configuration for the production runtime.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to (e.g., "0.0.0.0:10054")
    pub bind_address: String,
    /// Credential file
    pub users_path: PathBuf,
    /// Router configuration (session limit, queue capacity)
    pub router: RouterConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: format!("0.0.0.0:{DEFAULT_PORT}"),
            users_path: PathBuf::from("users.txt"),
            router: RouterConfig::default(),
        }
    }
}

/// Production chatboard server.
pub struct Server {
    listener: TcpListener,
    router: RouterHandle<TcpStream>,
    max_sessions: usize,
}

impl Server {
    /// Bind the listener and start the router.
    ///
    /// Must be called from within a Tokio runtime.
    pub async fn bind<S: UserStore>(config: ServerConfig, store: S) -> Result<Self, ServerError> {
        let addr: SocketAddr = config.bind_address.parse().map_err(|e| {
            ServerError::Config(format!("invalid bind address '{}': {e}", config.bind_address))
        })?;

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Transport(format!("failed to bind {addr}: {e}")))?;

        let max_sessions = config.router.max_sessions;
        let router = spawn_router(store, config.router);

        Ok(Self { listener, router, max_sessions })
    }

    /// Local address the server is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.listener.local_addr()?)
    }

    /// Handle to the router, e.g. to observe the active session count.
    pub fn router(&self) -> RouterHandle<TcpStream> {
        self.router.clone()
    }

    /// Accept connections until the router stops.
    ///
    /// While the session limit is reached, `accept` is not called at all;
    /// pending connections wait in the listen backlog.
    pub async fn run(self) -> Result<(), ServerError> {
        tracing::info!("Server listening on {}", self.listener.local_addr()?);

        let mut at_limit = false;

        loop {
            if self.router.active_count() >= self.max_sessions {
                if !at_limit {
                    tracing::info!(
                        "connection refused: limit of {} sessions reached",
                        self.max_sessions
                    );
                    at_limit = true;
                }
                self.router.wait_for_capacity(self.max_sessions).await;
                continue;
            }
            at_limit = false;

            match self.listener.accept().await {
                Ok((stream, peer)) => {
                    tracing::info!("connection received from {}", peer);
                    self.router.admit(stream).await?;
                },
                Err(e) => {
                    tracing::error!("Accept error: {}", e);
                },
            }
        }
    }
}
