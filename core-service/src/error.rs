use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    Runtime(#[from] core_runtime::Error),

    #[error("Authentication error: {0}")]
    Auth(#[from] core_auth::AuthError),

    #[error("Connection error: {0}")]
    Connection(#[from] core_connection::ConnectionError),

    #[error("Upload error: {0}")]
    Upload(#[from] core_upload::UploadError),

    /// A login/logout operation was requested but no identity provider is configured.
    #[error("Authentication is not configured")]
    AuthDisabled,
}

pub type Result<T> = std::result::Result<T, CoreError>;
