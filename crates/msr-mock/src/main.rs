//! msr-mock - serves the in-memory MSR stand-in on a local port.

use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::Parser;
use msr_mock::MockConfig;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// In-memory MSR API stand-in.
#[derive(Parser, Debug)]
#[command(name = "msr-mock", version, about)]
struct Args {
    /// Address to listen on.
    #[arg(long, env = "MSR_MOCK_ADDR", default_value = "127.0.0.1:8080")]
    addr: SocketAddr,

    /// Accepted username.
    #[arg(long, env = "MSR_MOCK_USERNAME", default_value = "admin")]
    username: String,

    /// Accepted password.
    #[arg(long, env = "MSR_MOCK_PASSWORD", default_value = "password", hide_env_values = true)]
    password: String,

    /// Version reported by the version endpoint.
    #[arg(long, default_value = "3.1.0")]
    server_version: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "msr_mock=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = MockConfig {
        username: args.username,
        password: args.password,
        version: args.server_version,
    };

    let listener = TcpListener::bind(args.addr)
        .await
        .with_context(|| format!("binding {}", args.addr))?;
    tracing::info!(addr = %args.addr, user = %config.username, "msr-mock listening");

    msr_mock::run(listener, &config).await.context("serving")?;
    Ok(())
}
