use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UploadError {
    /// The driver is no longer running, so the command cannot be delivered.
    #[error("Upload process is no longer running")]
    ProcessClosed,
}

pub type Result<T> = std::result::Result<T, UploadError>;
