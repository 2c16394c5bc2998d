use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::RwLock;

use super::{ensure_object, Document, DocumentStore, StoreResult};

/// Process-local document store. Contents are lost on restart.
#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<HashMap<String, BTreeMap<String, Document>>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn create(&self, collection: &str, key: &str, data: Value) -> StoreResult<Option<Document>> {
        ensure_object(&data)?;
        let mut collections = self.collections.write().await;
        let documents = collections.entry(collection.to_string()).or_default();
        if documents.contains_key(key) {
            return Ok(None);
        }

        let now = Utc::now();
        let document = Document {
            key: key.to_string(),
            data,
            created_at: now,
            updated_at: now,
        };
        documents.insert(key.to_string(), document.clone());
        Ok(Some(document))
    }

    async fn get(&self, collection: &str, key: &str) -> StoreResult<Option<Document>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|documents| documents.get(key))
            .cloned())
    }

    async fn list(&self, collection: &str) -> StoreResult<Vec<Document>> {
        let collections = self.collections.read().await;
        let mut documents: Vec<Document> = collections
            .get(collection)
            .map(|documents| documents.values().cloned().collect())
            .unwrap_or_default();
        documents.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(documents)
    }

    async fn update(&self, collection: &str, key: &str, patch: Value) -> StoreResult<Option<Document>> {
        ensure_object(&patch)?;
        let mut collections = self.collections.write().await;
        let Some(document) = collections
            .get_mut(collection)
            .and_then(|documents| documents.get_mut(key))
        else {
            return Ok(None);
        };

        if let (Some(target), Value::Object(fields)) = (document.data.as_object_mut(), patch) {
            target.extend(fields);
        }
        document.updated_at = Utc::now();
        Ok(Some(document.clone()))
    }

    async fn delete(&self, collection: &str, key: &str) -> StoreResult<bool> {
        let mut collections = self.collections.write().await;
        Ok(collections
            .get_mut(collection)
            .map(|documents| documents.remove(key).is_some())
            .unwrap_or(false))
    }
}
