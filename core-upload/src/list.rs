use crate::process::{UploadHandle, UploadSnapshot};
use parking_lot::RwLock;

/// Uploads currently shown to the user, in the order they were added.
#[derive(Debug, Default)]
pub struct UploadList {
    uploads: RwLock<Vec<UploadHandle>>,
}

impl UploadList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, handle: UploadHandle) {
        self.uploads.write().push(handle);
    }

    /// Remove every upload of `file_name`. Returns how many were removed.
    pub fn remove(&self, file_name: &str) -> usize {
        let mut uploads = self.uploads.write();
        let before = uploads.len();
        uploads.retain(|handle| handle.file_name() != file_name);
        before - uploads.len()
    }

    pub fn get(&self, file_name: &str) -> Option<UploadHandle> {
        self.uploads
            .read()
            .iter()
            .find(|handle| handle.file_name() == file_name)
            .cloned()
    }

    pub fn handles(&self) -> Vec<UploadHandle> {
        self.uploads.read().clone()
    }

    pub fn snapshots(&self) -> Vec<UploadSnapshot> {
        self.uploads.read().iter().map(UploadHandle::snapshot).collect()
    }

    pub fn len(&self) -> usize {
        self.uploads.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.uploads.read().is_empty()
    }
}
