//! Error responses in MSR's envelope format.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One entry of an error envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable code.
    pub code: String,
    /// Human-readable message.
    pub message: String,
}

/// `{"errors": [...]}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// Reported errors.
    pub errors: Vec<ErrorDetail>,
}

/// Errors the mock answers with.
#[derive(Debug, Error)]
pub enum MockError {
    /// Entity does not exist.
    #[error("{entity} {key} does not exist")]
    NotFound {
        /// Entity kind, e.g. "account".
        entity: &'static str,
        /// Key used in the request.
        key: String,
    },

    /// Entity with the same name already exists.
    #[error("{entity} {key} already exists")]
    Conflict {
        /// Entity kind.
        entity: &'static str,
        /// Conflicting name.
        key: String,
    },

    /// Malformed or incomplete request body.
    #[error("{0}")]
    BadRequest(String),

    /// Missing or wrong credentials.
    #[error("authentication required")]
    Unauthorized,
}

impl MockError {
    /// Creates a not-found error.
    pub fn not_found(entity: &'static str, key: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            key: key.into(),
        }
    }

    /// Creates a conflict error.
    pub fn conflict(entity: &'static str, key: impl Into<String>) -> Self {
        Self::Conflict {
            entity,
            key: key.into(),
        }
    }

    const fn status(&self) -> StatusCode {
        match self {
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
        }
    }

    fn code(&self) -> String {
        match self {
            Self::NotFound { entity, .. } => format!("NO_SUCH_{}", entity.to_uppercase()),
            Self::Conflict { entity, .. } => format!("{}_EXISTS", entity.to_uppercase()),
            Self::BadRequest(_) => "INVALID_JSON".to_string(),
            Self::Unauthorized => "NOT_AUTHENTICATED".to_string(),
        }
    }
}

impl IntoResponse for MockError {
    fn into_response(self) -> Response {
        let status = self.status();
        if matches!(self, Self::Unauthorized) {
            return status.into_response();
        }

        let envelope = ErrorEnvelope {
            errors: vec![ErrorDetail {
                code: self.code(),
                message: self.to_string(),
            }],
        };
        (status, Json(envelope)).into_response()
    }
}
