//! Readiness probe and version discovery.

use reqwest::Method;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::client::{Api, MsrClient};
use crate::context::CallContext;
use crate::error::{MsrError, Result, ResultExt};

/// Body of `GET /health`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthStatus {
    /// Error text when unhealthy.
    pub error: String,
    /// Whether the server is ready.
    pub healthy: bool,
}

/// Version information reported by the server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerInfo {
    /// MSR version string.
    pub version: String,
}

impl MsrClient {
    /// Reads the health endpoint.
    ///
    /// # Errors
    ///
    /// Returns any transport, API or decode error.
    pub async fn health(&self, ctx: &CallContext) -> Result<HealthStatus> {
        let url = self.endpoint(Api::Root, &["health"]);
        self.send_json(ctx, self.request(Method::GET, url))
            .await
            .context_with(|| "checking MSR health")
    }

    /// Returns whether the server reports itself healthy.
    ///
    /// # Errors
    ///
    /// Same as [`MsrClient::health`].
    pub async fn is_healthy(&self, ctx: &CallContext) -> Result<bool> {
        Ok(self.health(ctx).await?.healthy)
    }

    /// Reads the server version.
    ///
    /// # Errors
    ///
    /// Returns any transport, API or decode error.
    pub async fn version(&self, ctx: &CallContext) -> Result<ServerInfo> {
        let url = self.endpoint(Api::Registry, &["admin", "version"]);
        self.send_json(ctx, self.request(Method::GET, url))
            .await
            .context_with(|| "reading MSR version")
    }

    /// Checks that the server is healthy and returns its version.
    ///
    /// # Errors
    ///
    /// Returns [`MsrError::Unhealthy`] if the probe answers but reports the
    /// server unhealthy, otherwise any error from the two calls.
    #[instrument(skip_all, fields(host = %self.base_url()))]
    pub async fn verify(&self, ctx: &CallContext) -> Result<ServerInfo> {
        let status = self.health(ctx).await?;
        if !status.healthy {
            warn!(error = %status.error, "MSR reports unhealthy");
            return Err(MsrError::Unhealthy {
                reason: status.error,
            });
        }

        let info = self.version(ctx).await?;
        info!(version = %info.version, "Connected to MSR");
        Ok(info)
    }
}
