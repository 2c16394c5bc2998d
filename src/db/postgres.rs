use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{FromRow, PgPool};

use super::{ensure_object, Document, DocumentStore, StoreResult};

/// Documents live in one JSONB table keyed by `(collection, doc_key)`.
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

#[derive(FromRow)]
struct DocumentRow {
    doc_key: String,
    data: Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<DocumentRow> for Document {
    fn from(row: DocumentRow) -> Self {
        Document {
            key: row.doc_key,
            data: row.data,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn create(&self, collection: &str, key: &str, data: Value) -> StoreResult<Option<Document>> {
        ensure_object(&data)?;
        let row = sqlx::query_as::<_, DocumentRow>(
            "INSERT INTO documents (collection, doc_key, data) VALUES ($1, $2, $3) \
             ON CONFLICT (collection, doc_key) DO NOTHING \
             RETURNING doc_key, data, created_at, updated_at",
        )
        .bind(collection)
        .bind(key)
        .bind(&data)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Document::from))
    }

    async fn get(&self, collection: &str, key: &str) -> StoreResult<Option<Document>> {
        let row = sqlx::query_as::<_, DocumentRow>(
            "SELECT doc_key, data, created_at, updated_at FROM documents \
             WHERE collection = $1 AND doc_key = $2",
        )
        .bind(collection)
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Document::from))
    }

    async fn list(&self, collection: &str) -> StoreResult<Vec<Document>> {
        let rows = sqlx::query_as::<_, DocumentRow>(
            "SELECT doc_key, data, created_at, updated_at FROM documents \
             WHERE collection = $1 ORDER BY created_at DESC",
        )
        .bind(collection)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(Document::from).collect())
    }

    async fn update(&self, collection: &str, key: &str, patch: Value) -> StoreResult<Option<Document>> {
        ensure_object(&patch)?;
        let row = sqlx::query_as::<_, DocumentRow>(
            "UPDATE documents SET data = data || $3, updated_at = now() \
             WHERE collection = $1 AND doc_key = $2 \
             RETURNING doc_key, data, created_at, updated_at",
        )
        .bind(collection)
        .bind(key)
        .bind(&patch)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(Document::from))
    }

    async fn delete(&self, collection: &str, key: &str) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = $1 AND doc_key = $2")
            .bind(collection)
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

// Needs a reachable server: `DATABASE_URL=postgres://... cargo test -- --ignored`
#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::StoreError;
    use serde_json::json;

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires a Postgres DATABASE_URL"]
    async fn create_refuses_existing_key(pool: PgPool) {
        let store = PgDocumentStore::new(pool);
        let first = store
            .create("employees", "E1", json!({"name": "Ada"}))
            .await
            .unwrap();
        assert!(first.is_some());

        let second = store
            .create("employees", "E1", json!({"name": "Grace"}))
            .await
            .unwrap();
        assert!(second.is_none());

        let stored = store.get("employees", "E1").await.unwrap().unwrap();
        assert_eq!(stored.data["name"], "Ada");
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires a Postgres DATABASE_URL"]
    async fn concurrent_creates_admit_one_winner(pool: PgPool) {
        let store = PgDocumentStore::new(pool);
        let (a, b) = tokio::join!(
            store.create("employees", "E1", json!({"name": "Ada"})),
            store.create("employees", "E1", json!({"name": "Grace"})),
        );
        let created = [a.unwrap(), b.unwrap()].into_iter().flatten().count();
        assert_eq!(created, 1);
        assert_eq!(store.list("employees").await.unwrap().len(), 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires a Postgres DATABASE_URL"]
    async fn update_merges_and_skips_missing_keys(pool: PgPool) {
        let store = PgDocumentStore::new(pool);
        store
            .create("employees", "E1", json!({"name": "Ada", "role": "Engineer"}))
            .await
            .unwrap();

        let updated = store
            .update("employees", "E1", json!({"role": "Lead"}))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.data, json!({"name": "Ada", "role": "Lead"}));
        assert!(updated.updated_at >= updated.created_at);

        let missing = store
            .update("employees", "E2", json!({"role": "Lead"}))
            .await
            .unwrap();
        assert!(missing.is_none());
        assert!(store.get("employees", "E2").await.unwrap().is_none());
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires a Postgres DATABASE_URL"]
    async fn delete_reports_whether_anything_was_removed(pool: PgPool) {
        let store = PgDocumentStore::new(pool);
        store.create("users", "u1", json!({})).await.unwrap();

        assert!(store.delete("users", "u1").await.unwrap());
        assert!(!store.delete("users", "u1").await.unwrap());
        assert!(!store.delete("nothing-here", "u1").await.unwrap());
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires a Postgres DATABASE_URL"]
    async fn list_is_newest_first_and_scoped_to_the_collection(pool: PgPool) {
        let store = PgDocumentStore::new(pool);
        for key in ["E1", "E2", "E3"] {
            store.create("employees", key, json!({})).await.unwrap();
        }
        store.create("users", "u1", json!({})).await.unwrap();

        let keys: Vec<String> = store
            .list("employees")
            .await
            .unwrap()
            .into_iter()
            .map(|document| document.key)
            .collect();
        assert_eq!(keys, vec!["E3", "E2", "E1"]);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires a Postgres DATABASE_URL"]
    async fn rejects_non_object_documents(pool: PgPool) {
        let store = PgDocumentStore::new(pool);
        let err = store.create("a", "k", json!([1, 2])).await.unwrap_err();
        assert!(matches!(err, StoreError::NotAnObject));
    }
}
