//! Opaque blob storage collaborator (avatars, check-in photos).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BlobError {
    #[error("invalid blob path: {0}")]
    InvalidPath(String),
    #[error("blob not found: {0}")]
    NotFound(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub trait BlobStore: Send + Sync {
    /// Store `bytes` and return the public URL they are served from.
    fn upload(&self, bucket: &str, path: &str, bytes: &[u8]) -> Result<String, BlobError>;

    fn delete(&self, bucket: &str, path: &str) -> Result<(), BlobError>;
}

/// Reject anything that could escape the bucket: empty or dot segments,
/// absolute paths, backslashes, and characters outside `[A-Za-z0-9._-]`.
pub fn validate_blob_key(bucket: &str, path: &str) -> Result<(), BlobError> {
    let segment_ok = |seg: &str| {
        !seg.is_empty()
            && seg != "."
            && seg != ".."
            && seg
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
    };
    if !segment_ok(bucket) {
        return Err(BlobError::InvalidPath(bucket.to_string()));
    }
    if path.starts_with('/') || !path.split('/').all(segment_ok) {
        return Err(BlobError::InvalidPath(path.to_string()));
    }
    Ok(())
}
