use crate::request::ResponseData;
use bridge_traits::BridgeError;
use core_auth::AuthError;
use thiserror::Error;

/// Fallback shown when an error response carries no `detail`.
pub const UNKNOWN_API_ERROR: &str = "Unknown API response error data";

#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// The connection's cancellation handle was triggered.
    #[error("canceled")]
    Cancelled,

    /// No bearer token could be obtained. A login redirect is already under way.
    #[error("Unauthorized: {0}")]
    Unauthorized(#[source] AuthError),

    /// The server answered with a non-2xx status.
    #[error("Request failed with status code {status}")]
    Status { status: u16, body: ResponseData },

    #[error("Network error: {0}")]
    Transport(#[source] BridgeError),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl ConnectionError {
    /// Message suitable for showing to the user.
    ///
    /// Error responses contribute their JSON `detail` field when present.
    pub fn user_message(&self) -> String {
        match self {
            ConnectionError::Status { body, .. } => body
                .as_json()
                .and_then(|value| value.get("detail"))
                .and_then(|detail| detail.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| UNKNOWN_API_ERROR.to_string()),
            other => other.to_string(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ConnectionError::Cancelled)
    }

    /// HTTP status of an error response.
    pub fn status(&self) -> Option<u16> {
        match self {
            ConnectionError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl From<BridgeError> for ConnectionError {
    fn from(error: BridgeError) -> Self {
        match error {
            BridgeError::Cancelled => ConnectionError::Cancelled,
            other => ConnectionError::Transport(other),
        }
    }
}

pub type Result<T> = std::result::Result<T, ConnectionError>;
