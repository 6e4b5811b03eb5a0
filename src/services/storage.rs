//! Object storage seam used by the upload pipeline.

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("upload of {key} failed: {reason}")]
    Upload { key: String, reason: String },
    #[error("delete of {key} failed: {reason}")]
    Delete { key: String, reason: String },
}

#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Writes `data` under `key`, replacing any existing object.
    async fn put_object(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<(), StorageError>;

    async fn delete_object(&self, key: &str) -> Result<(), StorageError>;

    /// Publicly resolvable URL of `key`. Does not check that the object exists.
    fn public_url(&self, key: &str) -> String;
}

const FALLBACK_FILENAME: &str = "upload.bin";

/// Reduces a client-supplied filename to its last path component.
pub fn sanitize_filename(filename: &str) -> String {
    let name = filename
        .rsplit(|c: char| c == '/' || c == '\\')
        .next()
        .unwrap_or_default()
        .trim();

    match name {
        "" | "." | ".." => FALLBACK_FILENAME.to_string(),
        name => name.to_string(),
    }
}

/// Storage key for a survey's video: `{survey_id}/{filename}`.
pub fn object_key(survey_id: Uuid, filename: &str) -> String {
    format!("{}/{}", survey_id, sanitize_filename(filename))
}

/// Appends `key` to `base`, percent-encoding each key segment.
pub fn join_public_url(base: &str, key: &str) -> String {
    match url::Url::parse(base) {
        Ok(mut url) if !url.cannot_be_a_base() => {
            if let Ok(mut segments) = url.path_segments_mut() {
                segments.pop_if_empty().extend(key.split('/'));
            }
            url.to_string()
        }
        _ => format!("{}/{}", base.trim_end_matches('/'), key),
    }
}
