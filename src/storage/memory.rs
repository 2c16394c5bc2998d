use std::collections::HashMap;
use std::time::Duration;

use actix_web::web::Bytes;
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use url::Url;

use super::{decode_key, encode_key, ObjectStore, StorageResult};

// Contents are only read back by tests.
#[cfg_attr(not(test), allow(dead_code))]
#[derive(Debug, Clone, PartialEq)]
pub struct StoredObject {
    pub body: Bytes,
    pub content_type: String,
}

/// Process-local object store issuing `memory://<bucket>/<key>` URLs.
pub struct MemoryObjectStore {
    bucket: String,
    objects: RwLock<HashMap<String, StoredObject>>,
}

impl MemoryObjectStore {
    pub fn new(bucket: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            objects: RwLock::new(HashMap::new()),
        }
    }
}

/// Inspection helpers for tests.
#[cfg(test)]
impl MemoryObjectStore {
    pub async fn get(&self, key: &str) -> Option<StoredObject> {
        self.objects.read().await.get(key).cloned()
    }

    /// Dereferences a URL issued by this store.
    pub async fn fetch(&self, url: &str) -> Option<StoredObject> {
        let key = self.key_from_url(url)?;
        self.get(&key).await
    }

    pub async fn object_count(&self) -> usize {
        self.objects.read().await.len()
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put(&self, key: &str, body: Bytes, content_type: &str) -> StorageResult<()> {
        self.objects.write().await.insert(
            key.to_string(),
            StoredObject {
                body,
                content_type: content_type.to_string(),
            },
        );
        Ok(())
    }

    async fn signed_url(&self, key: &str, expires_in: Duration) -> StorageResult<String> {
        let expires = Utc::now().timestamp() + expires_in.as_secs() as i64;
        Ok(format!(
            "memory://{}/{}?expires={}",
            self.bucket,
            encode_key(key),
            expires
        ))
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.objects.write().await.remove(key);
        Ok(())
    }

    fn key_from_url(&self, url: &str) -> Option<String> {
        let url = Url::parse(url).ok()?;
        if url.scheme() != "memory" || url.host_str() != Some(self.bucket.as_str()) {
            return None;
        }
        decode_key(url.path().trim_start_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn signed_urls_dereference_to_the_stored_bytes() {
        let store = MemoryObjectStore::new("photos");
        store
            .put("my photo (1).png", Bytes::from_static(b"\x89PNG"), "image/png")
            .await
            .unwrap();

        let url = store
            .signed_url("my photo (1).png", Duration::from_secs(60))
            .await
            .unwrap();
        assert!(url.starts_with("memory://photos/my%20photo%20%281%29.png?expires="));

        let object = store.fetch(&url).await.unwrap();
        assert_eq!(object.body, Bytes::from_static(b"\x89PNG"));
        assert_eq!(object.content_type, "image/png");
    }

    #[tokio::test]
    async fn urls_from_other_buckets_do_not_resolve() {
        let store = MemoryObjectStore::new("photos");
        assert_eq!(store.key_from_url("memory://other/a.png"), None);
        assert_eq!(store.key_from_url("https://photos/a.png"), None);
    }

    #[tokio::test]
    async fn put_overwrites_same_key() {
        let store = MemoryObjectStore::new("photos");
        store.put("a.txt", Bytes::from_static(b"one"), "text/plain").await.unwrap();
        store.put("a.txt", Bytes::from_static(b"two"), "text/plain").await.unwrap();

        assert_eq!(store.object_count().await, 1);
        assert_eq!(store.get("a.txt").await.unwrap().body, Bytes::from_static(b"two"));
    }
}
