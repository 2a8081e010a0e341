//! Chatboard client binary.
//!
//! # Usage
//!
//! ```bash
//! chatboard-client
//! chatboard-client --server 10.0.0.5:10054
//! ```

use chatboard_proto::DEFAULT_PORT;
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Chatboard line client
#[derive(Parser, Debug)]
#[command(name = "chatboard-client")]
#[command(about = "Interactive client for the chatboard relay")]
#[command(version)]
struct Args {
    /// Server address
    #[arg(short, long, default_value_t = format!("127.0.0.1:{DEFAULT_PORT}"))]
    server: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    // Chat goes to stdout; keep logs out of it
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let stream = chatboard_client::connect(&args.server).await?;
    chatboard_client::run(stream, tokio::io::stdin(), tokio::io::stdout()).await?;

    Ok(())
}
