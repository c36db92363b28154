//! Client error types

use serde::Deserialize;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, ClientError>;

/// Client errors
#[derive(Error, Debug)]
pub enum ClientError {
    /// Invalid configuration, raised before any request is sent
    #[error("Configuration error: {0}")]
    Config(String),

    /// Connectivity failure (DNS, socket, timeout)
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The service answered with an error status
    #[error("B2 error {status} ({code}): {message}")]
    Remote {
        status: u16,
        code: String,
        message: String,
    },

    /// The upload protocol was not followed (part numbering, missing completion)
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// IO error while reading the upload source
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid response
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Bucket not found
    #[error("Bucket not found: {0}")]
    BucketNotFound(String),

    /// No bucket id given and none selected on the session
    #[error("No bucket selected, call Session::set_bucket first")]
    NoBucketSelected,
}

/// Error body returned by every B2 endpoint
#[derive(Debug, Deserialize)]
struct ErrorBody {
    status: Option<u16>,
    code: Option<String>,
    message: Option<String>,
}

impl ClientError {
    /// Parse a B2 error from a JSON response body
    pub fn from_b2_json(body: &str, status: u16) -> Self {
        match serde_json::from_str::<ErrorBody>(body) {
            Ok(parsed) => Self::Remote {
                status: parsed.status.unwrap_or(status),
                code: parsed.code.unwrap_or_else(|| format!("http_{}", status)),
                message: parsed.message.unwrap_or_default(),
            },
            Err(_) => Self::Remote {
                status,
                code: format!("http_{}", status),
                message: body.to_string(),
            },
        }
    }

    /// HTTP status reported by the service, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Remote { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Check if this is a connectivity failure
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    /// Check if the service rejected the request
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote { .. })
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::BucketNotFound(_))
            || matches!(self, Self::Remote { status: 404, .. })
            || matches!(self, Self::Remote { code, .. } if code == "not_found")
    }

    /// Check if the account token was rejected
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Remote { status: 401, .. })
    }
}
