//! Error types for MSR client operations.
//!
//! Every failure is an [`MsrError`]. Operations wrap lower-level failures in
//! [`MsrError::Context`] to say which resource they were working on; callers
//! branch on [`MsrError::kind`] and [`MsrError::status`], which look through
//! those wrappers, instead of matching on messages.

use thiserror::Error;

/// Result type alias for MSR client operations.
pub type Result<T> = std::result::Result<T, MsrError>;

/// Why an HTTP exchange never produced a response.
#[derive(Debug, Error)]
pub enum TransportCause {
    /// DNS, connection, TLS, timeout or body read failure.
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// The caller's cancellation signal fired.
    #[error("operation cancelled by caller")]
    Cancelled,

    /// The caller's deadline passed.
    #[error("caller deadline exceeded")]
    DeadlineExceeded,
}

impl TransportCause {
    /// Returns true when the caller asked for the work to stop.
    #[must_use]
    pub const fn is_interruption(&self) -> bool {
        matches!(self, Self::Cancelled | Self::DeadlineExceeded)
    }
}

/// Errors that can occur while talking to MSR.
#[derive(Debug, Error)]
pub enum MsrError {
    /// Client construction input is missing or malformed.
    #[error("MSR client configuration is invalid: {reason}")]
    Config {
        /// What is wrong with the configuration.
        reason: String,
    },

    /// The request never produced a response.
    #[error("request to MSR failed: {source}")]
    Transport {
        /// Underlying cause.
        #[source]
        source: TransportCause,
    },

    /// MSR rejected the credentials.
    #[error("unauthorized request in MSR client: status code {status}")]
    Unauthorized {
        /// HTTP status code.
        status: u16,
    },

    /// A success or error body was not the expected JSON.
    #[error("unmarshaling response failed in MSR client: status code {status}: {source}")]
    Decode {
        /// HTTP status code of the response being decoded.
        status: u16,
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },

    /// An error response carried a valid but empty error list.
    #[error("request returned an empty error envelope in MSR client: status code {status}")]
    EmptyErrorEnvelope {
        /// HTTP status code.
        status: u16,
    },

    /// MSR reported a business error.
    #[error("request returned error in MSR client: status code {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// First message from the error envelope.
        message: String,
    },

    /// A create or update payload was the zero value of its type.
    #[error("empty {payload} payload passed to MSR client")]
    EmptyInput {
        /// Name of the payload type.
        payload: &'static str,
    },

    /// A composite resource id did not split into exactly two parts.
    #[error("resource ID is invalid format '{id}'")]
    InvalidResourceId {
        /// The rejected id.
        id: String,
    },

    /// An equivalent pruning policy already exists for the repository.
    #[error("an equivalent pruning policy '{existing_id}' already exists for {org}/{repo}")]
    PolicyConflict {
        /// Organization name.
        org: String,
        /// Repository name.
        repo: String,
        /// Id of the existing equivalent policy.
        existing_id: String,
    },

    /// The readiness probe reported an unhealthy server.
    #[error("MSR reports unhealthy: {reason}")]
    Unhealthy {
        /// Error text from the health endpoint.
        reason: String,
    },

    /// A request body could not be serialized.
    #[error("marshaling request failed in MSR client: {source}")]
    Encode {
        /// Underlying error.
        #[source]
        source: serde_json::Error,
    },

    /// Call-site context around another error.
    #[error("{action} failed: {source}")]
    Context {
        /// What the caller was doing, e.g. "reading repository acme/web".
        action: String,
        /// Wrapped error.
        #[source]
        source: Box<MsrError>,
    },
}

/// Kind of an [`MsrError`], with context wrappers removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// See [`MsrError::Config`].
    Config,
    /// See [`MsrError::Transport`].
    Transport,
    /// See [`MsrError::Unauthorized`].
    Unauthorized,
    /// See [`MsrError::Decode`].
    Decode,
    /// See [`MsrError::EmptyErrorEnvelope`].
    EmptyErrorEnvelope,
    /// See [`MsrError::Api`].
    Api,
    /// See [`MsrError::EmptyInput`].
    EmptyInput,
    /// See [`MsrError::InvalidResourceId`].
    InvalidResourceId,
    /// See [`MsrError::PolicyConflict`].
    PolicyConflict,
    /// See [`MsrError::Unhealthy`].
    Unhealthy,
    /// See [`MsrError::Encode`].
    Encode,
}

impl MsrError {
    /// Creates a configuration error.
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    /// Wraps this error with call-site context.
    #[must_use]
    pub fn context(self, action: impl Into<String>) -> Self {
        Self::Context {
            action: action.into(),
            source: Box::new(self),
        }
    }

    /// Returns the innermost error, skipping context wrappers.
    #[must_use]
    pub fn root(&self) -> &Self {
        let mut err = self;
        while let Self::Context { source, .. } = err {
            err = source;
        }
        err
    }

    /// Returns the kind of the innermost error.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Context { source, .. } => source.kind(),
            Self::Config { .. } => ErrorKind::Config,
            Self::Transport { .. } => ErrorKind::Transport,
            Self::Unauthorized { .. } => ErrorKind::Unauthorized,
            Self::Decode { .. } => ErrorKind::Decode,
            Self::EmptyErrorEnvelope { .. } => ErrorKind::EmptyErrorEnvelope,
            Self::Api { .. } => ErrorKind::Api,
            Self::EmptyInput { .. } => ErrorKind::EmptyInput,
            Self::InvalidResourceId { .. } => ErrorKind::InvalidResourceId,
            Self::PolicyConflict { .. } => ErrorKind::PolicyConflict,
            Self::Unhealthy { .. } => ErrorKind::Unhealthy,
            Self::Encode { .. } => ErrorKind::Encode,
        }
    }

    /// Returns the HTTP status code the error was tagged with, if any.
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self.root() {
            Self::Unauthorized { status }
            | Self::Decode { status, .. }
            | Self::EmptyErrorEnvelope { status }
            | Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns true when the error is a 404 reported by MSR.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::Api && self.status() == Some(404)
    }

    /// Returns true when the caller cancelled the work or its deadline passed.
    #[must_use]
    pub fn is_interruption(&self) -> bool {
        matches!(self.root(), Self::Transport { source } if source.is_interruption())
    }
}

impl From<TransportCause> for MsrError {
    fn from(source: TransportCause) -> Self {
        Self::Transport { source }
    }
}

impl From<reqwest::Error> for MsrError {
    fn from(err: reqwest::Error) -> Self {
        TransportCause::Http(err).into()
    }
}

/// Adds call-site context to results.
pub(crate) trait ResultExt<T> {
    /// Wraps the error, if any, with the action being attempted.
    fn context_with<F, S>(self, action: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context_with<F, S>(self, action: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|err| err.context(action()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_api() {
        let err = MsrError::Api {
            status: 400,
            message: "Bad request".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "request returned error in MSR client: status code 400: Bad request"
        );
    }

    #[test]
    fn test_context_keeps_kind_and_status() {
        let err = MsrError::Api {
            status: 404,
            message: "no such repository".to_string(),
        }
        .context("reading repository acme/web")
        .context("reconciling repository");

        assert_eq!(err.kind(), ErrorKind::Api);
        assert_eq!(err.status(), Some(404));
        assert!(err.is_not_found());
        assert!(err.to_string().starts_with("reconciling repository failed"));
    }

    #[test]
    fn test_status_absent_for_local_errors() {
        let err = MsrError::EmptyInput {
            payload: "CreateAccount",
        };
        assert_eq!(err.status(), None);
        assert_eq!(err.kind(), ErrorKind::EmptyInput);
    }

    #[test]
    fn test_interruption_detection() {
        let err = MsrError::from(TransportCause::Cancelled).context("removing member");
        assert!(err.is_interruption());
        assert_eq!(err.kind(), ErrorKind::Transport);

        let err = MsrError::Unauthorized { status: 401 };
        assert!(!err.is_interruption());
    }

    #[test]
    fn test_source_chain_reaches_root() {
        use std::error::Error as _;

        let err = MsrError::Unauthorized { status: 401 }.context("reading account alice");
        let source = err.source().expect("context has a source");
        assert_eq!(
            source.to_string(),
            "unauthorized request in MSR client: status code 401"
        );
    }
}
