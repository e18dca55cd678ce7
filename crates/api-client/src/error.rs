//! Error types for the ESI client

use esi_core::Id;
use thiserror::Error;

/// Result type alias for ESI operations
pub type ApiResult<T> = Result<T, ApiError>;

/// ESI client errors
#[derive(Error, Debug)]
pub enum ApiError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// ESI returned an error response
    #[error("ESI error ({status}): {message}")]
    ApiResponse {
        /// HTTP status code
        status: u16,
        /// Error message from ESI
        message: String,
    },

    /// A path parameter required by the operation was not supplied
    #[error("Operation {operation} is missing path parameter `{parameter}`")]
    MissingParameter {
        /// ESI operation id
        operation: &'static str,
        /// Name of the missing parameter
        parameter: String,
    },

    /// The backend returned no data for an entity addressed on its own
    #[error("{resource} {id} not found")]
    NotFound {
        /// Kind of entity that was looked up
        resource: &'static str,
        /// Id that was looked up
        id: Id,
    },

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an API response error
    pub fn api_response(status: u16, message: impl Into<String>) -> Self {
        Self::ApiResponse {
            status,
            message: message.into(),
        }
    }

    /// Create a not-found error
    #[must_use]
    pub fn not_found(resource: &'static str, id: Id) -> Self {
        Self::NotFound { resource, id }
    }

    /// HTTP status code, if ESI answered
    #[must_use]
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::ApiResponse { status, .. } => Some(*status),
            Self::Request(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Check if this is a client error (4xx)
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::ApiResponse { status, .. } if (400..500).contains(status))
    }

    /// Check if this is a server error (5xx)
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::ApiResponse { status, .. } if *status >= 500)
    }
}
