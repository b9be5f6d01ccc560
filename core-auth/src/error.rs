use bridge_traits::BridgeError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    /// No session exists. A login redirect has already been triggered.
    #[error("Not authenticated")]
    NotAuthenticated,

    /// The session could not be renewed. It was cleared and a login redirect
    /// has already been triggered.
    #[error("Unable to refresh token, logging out: {0}")]
    TokenRefreshFailed(String),

    #[error("Login callback state mismatch")]
    StateMismatch,

    #[error("Invalid auth configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),
}

pub type Result<T> = std::result::Result<T, AuthError>;
