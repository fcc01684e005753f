//! Configuration types for the MSR client.

use std::fmt;
use std::time::Duration;

use crate::error::{MsrError, Result};

/// Default request timeout.
///
/// Creating or updating a pruning policy triggers an initial evaluation on
/// the server, which can take minutes on large repositories.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(240);

/// Basic authentication credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    username: String,
    password: String,
}

impl Credentials {
    /// Creates credentials from a username and password.
    ///
    /// # Examples
    ///
    /// ```
    /// use msr_client::Credentials;
    ///
    /// let creds = Credentials::new("admin", "secret");
    /// assert_eq!(creds.username(), "admin");
    /// ```
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Returns the username.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Returns the password.
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// How server certificates are checked.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TlsMode {
    /// Verify certificates against the system roots.
    #[default]
    Verify,

    /// Accept any certificate. Only reachable through
    /// [`ClientConfig::danger_skip_tls_verification`].
    Skip,
}

/// Configuration for [`MsrClient`](crate::MsrClient).
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// MSR base URL (e.g., "<https://msr.example.com>").
    pub base_url: String,

    /// Credentials sent with every request.
    pub credentials: Credentials,

    /// Overall request timeout, applied to every request.
    pub timeout: Duration,

    /// Certificate verification mode.
    tls: TlsMode,

    /// User agent string.
    pub user_agent: String,
}

impl ClientConfig {
    /// Creates a configuration with certificate verification enabled.
    ///
    /// # Examples
    ///
    /// ```
    /// use msr_client::{ClientConfig, Credentials, TlsMode};
    ///
    /// let config = ClientConfig::new("https://msr.example.com", Credentials::new("admin", "pw"));
    /// assert_eq!(config.tls_mode(), TlsMode::Verify);
    /// ```
    #[must_use]
    pub fn new(base_url: impl Into<String>, credentials: Credentials) -> Self {
        Self {
            base_url: base_url.into(),
            credentials,
            timeout: DEFAULT_TIMEOUT,
            tls: TlsMode::Verify,
            user_agent: format!("msr-client/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    /// Sets the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Disables server certificate verification.
    ///
    /// # Warning
    ///
    /// Only for lab installations with self-signed certificates.
    #[must_use]
    pub const fn danger_skip_tls_verification(mut self) -> Self {
        self.tls = TlsMode::Skip;
        self
    }

    /// Returns the certificate verification mode.
    #[must_use]
    pub const fn tls_mode(&self) -> TlsMode {
        self.tls
    }

    /// Checks that every required input is present.
    ///
    /// # Errors
    ///
    /// Returns [`MsrError::Config`] naming the missing inputs.
    pub fn validate(&self) -> Result<()> {
        let missing: Vec<&str> = [
            ("host", self.base_url.trim()),
            ("username", self.credentials.username()),
            ("password", self.credentials.password()),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_empty())
        .map(|(name, _)| name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(MsrError::config(format!(
                "MSR client did not receive {}",
                missing.join(", ")
            )))
        }
    }
}
