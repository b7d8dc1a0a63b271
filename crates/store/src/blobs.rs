use std::path::PathBuf;

use tethered_core::blob::{BlobError, BlobStore, validate_blob_key};

/// Blob store on the local filesystem: `<root>/<bucket>/<path>`, served
/// back under `<base_url>/blobs/<bucket>/<path>`.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
    base_url: String,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>, base_url: &str) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn path_for(&self, bucket: &str, path: &str) -> Result<PathBuf, BlobError> {
        validate_blob_key(bucket, path)?;
        Ok(self.root.join(bucket).join(path))
    }
}

impl BlobStore for LocalBlobStore {
    fn upload(&self, bucket: &str, path: &str, bytes: &[u8]) -> Result<String, BlobError> {
        let target = self.path_for(bucket, path)?;
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&target, bytes)?;
        tracing::debug!(bucket, path, size = bytes.len(), "stored blob");
        Ok(format!("{}/blobs/{bucket}/{path}", self.base_url))
    }

    fn delete(&self, bucket: &str, path: &str) -> Result<(), BlobError> {
        let target = self.path_for(bucket, path)?;
        match std::fs::remove_file(&target) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(BlobError::NotFound(format!("{bucket}/{path}")))
            }
            Err(e) => Err(e.into()),
        }
    }
}
