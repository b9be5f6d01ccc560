//! File upload request helper

use crate::error::{ConnectionError, Result};
use crate::request::RequestConfig;
use bridge_traits::http::MultipartForm;
use bytes::Bytes;
use std::path::Path;

/// Multipart field carrying the file payload.
pub const UPLOAD_FIELD_NAME: &str = "file";

/// A file selected for upload, held in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDescriptor {
    name: String,
    content: Bytes,
    content_type: Option<String>,
}

impl FileDescriptor {
    pub fn new(name: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            content_type: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Read a file from disk. The descriptor name is the file name component.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_else(|| {
                ConnectionError::Serialization(format!("Invalid file name: {}", path.display()))
            })?
            .to_string();

        let content = tokio::fs::read(path).await.map_err(|e| {
            ConnectionError::Serialization(format!("Failed to read {}: {}", path.display(), e))
        })?;

        Ok(Self::new(name, content))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Size in bytes.
    pub fn size(&self) -> u64 {
        self.content.len() as u64
    }

    pub fn content(&self) -> &Bytes {
        &self.content
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }
}

/// Request description for uploading `file` to `url`.
///
/// The payload goes out as a single multipart field named `file`, with a
/// `Content-Range` covering the whole file. No timeout is set.
pub fn build_upload_config(file: &FileDescriptor, url: impl Into<String>) -> RequestConfig {
    let size = file.size();
    let form = MultipartForm::new().file(
        UPLOAD_FIELD_NAME,
        file.name(),
        file.content_type.clone(),
        file.content.clone(),
    );

    RequestConfig::post(url)
        .header("Content-Type", "multipart/form-data")
        .header("Content-Range", format!("bytes=0-{}/{}", size, size))
        .multipart(form)
}
