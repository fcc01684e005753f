//! msr - reconcile accounts, team membership and pruning policies on MSR.

use anyhow::Result;
use clap::Parser;
use msr_client::CallContext;
use tracing::warn;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "msr=info,msr_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    // Ctrl-C aborts whatever request is in flight.
    let (ctx, cancel) = CallContext::cancellable();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling");
            cancel.cancel();
        }
    });

    let output = match cli.command {
        Commands::Status(args) => commands::status::run(&ctx, &args).await?,
        Commands::Accounts(args) => commands::accounts::run(&ctx, &args).await?,
        Commands::SyncMembers(args) => commands::members::run(&ctx, &args).await?,
        Commands::EnsurePruningPolicy(args) => commands::pruning::run(&ctx, &args).await?,
        Commands::Password(args) => commands::password::run(&args),
        Commands::Version => format!("msr {}", env!("CARGO_PKG_VERSION")),
    };

    println!("{output}");
    Ok(())
}
