mod memory;
mod postgres;

pub use memory::MemoryDocumentStore;
pub use postgres::PgDocumentStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("document must be a JSON object")]
    NotAnObject,
}

pub type StoreResult<T> = Result<T, StoreError>;

/// A schema-less record addressed by collection and key.
#[derive(Debug, Clone)]
pub struct Document {
    pub key: String,
    pub data: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Keyed JSON document storage. Timestamps are assigned by the store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Inserts `data` under `key` unless the key is taken, in which case `None` is returned.
    async fn create(&self, collection: &str, key: &str, data: Value) -> StoreResult<Option<Document>>;

    async fn get(&self, collection: &str, key: &str) -> StoreResult<Option<Document>>;

    /// Every document in the collection, newest first.
    async fn list(&self, collection: &str) -> StoreResult<Vec<Document>>;

    /// Shallow-merges `patch` into an existing document. `None` if the key is absent.
    async fn update(&self, collection: &str, key: &str, patch: Value) -> StoreResult<Option<Document>>;

    /// Returns `false` if there was nothing to delete.
    async fn delete(&self, collection: &str, key: &str) -> StoreResult<bool>;
}

pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
}

fn ensure_object(data: &Value) -> StoreResult<()> {
    if data.is_object() {
        Ok(())
    } else {
        Err(StoreError::NotAnObject)
    }
}
