//! Status command implementation.

use anyhow::{Context, Result};
use clap::Args;
use msr_client::CallContext;
use serde::Serialize;
use tracing::info;

use super::{ConnectionArgs, OutputFormat};

/// Arguments for the status command.
#[derive(Args)]
pub struct StatusArgs {
    #[command(flatten)]
    pub connection: ConnectionArgs,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

/// What the status command reports.
#[derive(Debug, Serialize)]
struct StatusReport {
    host: String,
    healthy: bool,
    version: String,
}

/// Runs the status command.
pub async fn run(ctx: &CallContext, args: &StatusArgs) -> Result<String> {
    let client = args.connection.client()?;
    info!(host = %client.base_url(), "Checking MSR status");

    let info = client.verify(ctx).await.context("MSR is not ready")?;
    let report = StatusReport {
        host: client.base_url().to_string(),
        healthy: true,
        version: info.version,
    };

    match args.format {
        OutputFormat::Text => Ok(format!(
            "MSR at {} is healthy (version {})",
            report.host, report.version
        )),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(&report)?),
    }
}

#[cfg(test)]
mod tests {
    use msr_mock::MockHandle;

    use super::*;
    use crate::commands::testing::connection;

    #[tokio::test]
    async fn test_status_reports_version() {
        let mock = MockHandle::start().await.unwrap();
        let args = StatusArgs {
            connection: connection(&mock),
            format: OutputFormat::Json,
        };

        let output = run(&CallContext::background(), &args).await.unwrap();
        let json: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(json["healthy"], true);
        assert_eq!(json["version"], "3.1.0");
    }

    #[tokio::test]
    async fn test_status_fails_when_unhealthy() {
        let mock = MockHandle::start().await.unwrap();
        mock.registry().set_health(false, "storage offline");
        let args = StatusArgs {
            connection: connection(&mock),
            format: OutputFormat::Text,
        };

        let err = run(&CallContext::background(), &args).await.unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("MSR is not ready"));
        assert!(message.contains("storage offline"));
    }
}
