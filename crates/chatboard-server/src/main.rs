//! Chatboard server binary.
//!
//! # Usage
//!
//! ```bash
//! # Serve on the default port with ./users.txt
//! chatboard-server
//!
//! # Custom address, credential file and session limit
//! chatboard-server --bind 127.0.0.1:9000 --users /etc/chatboard/users.txt --max-clients 50
//! ```

use std::path::PathBuf;

use chatboard_proto::DEFAULT_MAX_CLIENTS;
use chatboard_server::{
    DEFAULT_OUTBOUND_CAPACITY, FileUserStore, RouterConfig, Server, ServerConfig,
};
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Chatboard relay server
#[derive(Parser, Debug)]
#[command(name = "chatboard-server")]
#[command(about = "Line-oriented chat relay server")]
#[command(version)]
struct Args {
    /// Address to bind to
    #[arg(short, long, default_value = "0.0.0.0:10054")]
    bind: String,

    /// Credential file, one `(username, password)` record per line
    #[arg(short, long, default_value = "users.txt")]
    users: PathBuf,

    /// Maximum concurrent connections
    #[arg(long, default_value_t = DEFAULT_MAX_CLIENTS)]
    max_clients: usize,

    /// Lines buffered per connection before a slow client is dropped
    #[arg(long, default_value_t = DEFAULT_OUTBOUND_CAPACITY)]
    queue_capacity: usize,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let config = ServerConfig {
        bind_address: args.bind,
        users_path: args.users,
        router: RouterConfig { max_sessions: args.max_clients, outbound_capacity: args.queue_capacity },
    };

    let store = match FileUserStore::open(&config.users_path) {
        Ok(store) => store,
        Err(e) => {
            tracing::error!("cannot load {}: {}", config.users_path.display(), e);
            return Err(e.into());
        },
    };

    tracing::info!("Chatboard server starting");
    tracing::info!("Binding to {}", config.bind_address);

    let server = Server::bind(config, store).await?;
    server.run().await?;

    Ok(())
}
