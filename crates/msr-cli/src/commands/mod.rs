//! CLI commands and argument parsing.

pub mod accounts;
pub mod members;
pub mod password;
pub mod pruning;
pub mod status;

use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use msr_client::{ClientConfig, Credentials, MsrClient};
use tracing::warn;

/// msr - keep Mirantis Secure Registry in its declared state
#[derive(Parser)]
#[command(name = "msr")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Check that MSR is healthy and print its version
    Status(status::StatusArgs),

    /// List accounts
    Accounts(accounts::AccountsArgs),

    /// Converge the members of a team to the given account ids
    SyncMembers(members::MembersArgs),

    /// Create a pruning policy unless an equivalent one exists
    EnsurePruningPolicy(pruning::PruningArgs),

    /// Generate a random password for a new account
    Password(password::PasswordArgs),

    /// Print version information
    Version,
}

/// How to reach MSR. Every flag can also come from the environment.
#[derive(Args, Clone)]
pub struct ConnectionArgs {
    /// MSR base URL, e.g. https://msr.example.com
    #[arg(long, env = "MSR_HOST")]
    pub host: String,

    /// Username for basic authentication
    #[arg(short, long, env = "MSR_USERNAME")]
    pub username: String,

    /// Password for basic authentication
    #[arg(long, env = "MSR_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// Accept any TLS certificate
    #[arg(long, env = "MSR_UNSAFE_TLS")]
    pub unsafe_tls: bool,

    /// Per-request timeout in seconds
    #[arg(long, env = "MSR_TIMEOUT_SECS", default_value = "240")]
    pub timeout_secs: u64,
}

impl ConnectionArgs {
    /// Builds a client from these settings.
    pub fn client(&self) -> Result<MsrClient> {
        let mut config = ClientConfig::new(
            &self.host,
            Credentials::new(&self.username, &self.password),
        )
        .with_timeout(Duration::from_secs(self.timeout_secs));

        if self.unsafe_tls {
            warn!(host = %self.host, "TLS certificate verification is disabled");
            config = config.danger_skip_tls_verification();
        }

        MsrClient::from_config(config).context("Invalid MSR connection settings")
    }
}

/// Output format shared by the read commands.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}
