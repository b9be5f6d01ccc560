use bridge_traits::BridgeError;
use thiserror::Error;

/// Startup and wiring errors raised by the runtime layer.
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or malformed configuration value.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A host bridge the configuration needs was not provided.
    #[error("Capability missing: {capability} - {message}")]
    CapabilityMissing { capability: String, message: String },

    /// A platform default bridge failed to initialize.
    #[error("Bridge error: {0}")]
    Bridge(#[from] BridgeError),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;
