mod memory;
mod s3;

pub use memory::MemoryObjectStore;
pub use s3::{create_s3_client, S3ObjectStore};

use std::time::Duration;

use actix_web::web::Bytes;
use async_trait::async_trait;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("object store request failed: {0}")]
    Request(String),
    #[error("invalid presigning configuration: {0}")]
    Presign(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Binary blob storage with read-only signed URLs.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Returns once the object is fully written.
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> StorageResult<()>;

    async fn signed_url(&self, key: &str, expires_in: Duration) -> StorageResult<String>;

    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Recovers the object key from a URL handed out by [`ObjectStore::signed_url`].
    /// `None` when the URL points somewhere else.
    fn key_from_url(&self, url: &str) -> Option<String>;
}

const KEY_ESCAPES: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'/');

pub(crate) fn encode_key(key: &str) -> String {
    utf8_percent_encode(key, KEY_ESCAPES).to_string()
}

pub(crate) fn decode_key(path: &str) -> Option<String> {
    let key = percent_decode_str(path).decode_utf8().ok()?;
    if key.is_empty() {
        None
    } else {
        Some(key.into_owned())
    }
}
