//! SQLite document store
//!
//! Implements `RemoteCollectionGateway` on top of a single `documents`
//! table keyed by (owner, collection, doc id). Bodies are stored as JSON
//! text; writes are last-write-wins.

use super::models::Document;
use crate::error::{AppError, Result};
use crate::gateway::{merge_documents, RemoteCollectionGateway};
use crate::session::OwnerId;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};

#[derive(Debug, FromRow)]
struct DocumentRow {
    doc_id: String,
    body: String,
}

/// Durable gateway backed by SQLite
#[derive(Clone)]
pub struct SqliteGateway {
    pool: SqlitePool,
}

impl SqliteGateway {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// Bodies that are not a JSON object cannot be mapped to a record
fn parse_body(doc_id: &str, body: &str) -> Option<Document> {
    match serde_json::from_str(body) {
        Ok(doc) => Some(doc),
        Err(e) => {
            tracing::warn!("Stored document {} is unreadable: {}", doc_id, e);
            None
        }
    }
}

async fn upsert<'e, E>(
    executor: E,
    owner: &OwnerId,
    collection: &str,
    doc_id: &str,
    body: &str,
    now: DateTime<Utc>,
) -> Result<()>
where
    E: sqlx::Executor<'e, Database = sqlx::Sqlite>,
{
    sqlx::query(
        r#"
        INSERT INTO documents (owner_id, collection, doc_id, body, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?)
        ON CONFLICT(owner_id, collection, doc_id)
        DO UPDATE SET body = excluded.body, updated_at = excluded.updated_at
        "#,
    )
    .bind(owner.as_str())
    .bind(collection)
    .bind(doc_id)
    .bind(body)
    .bind(now)
    .bind(now)
    .execute(executor)
    .await?;

    Ok(())
}

#[async_trait]
impl RemoteCollectionGateway for SqliteGateway {
    async fn get(
        &self,
        owner: &OwnerId,
        collection: &str,
        doc_id: &str,
    ) -> Result<Option<Document>> {
        let body: Option<String> = sqlx::query_scalar(
            r#"
            SELECT body FROM documents
            WHERE owner_id = ? AND collection = ? AND doc_id = ?
            "#,
        )
        .bind(owner.as_str())
        .bind(collection)
        .bind(doc_id)
        .fetch_optional(&self.pool)
        .await?;

        match body {
            Some(body) => parse_body(doc_id, &body)
                .map(Some)
                .ok_or_else(|| AppError::NotFound(doc_id.to_string())),
            None => Ok(None),
        }
    }

    async fn get_all(&self, owner: &OwnerId, collection: &str) -> Result<Vec<(String, Document)>> {
        let rows = sqlx::query_as::<_, DocumentRow>(
            r#"
            SELECT doc_id, body FROM documents
            WHERE owner_id = ? AND collection = ?
            ORDER BY created_at ASC, doc_id ASC
            "#,
        )
        .bind(owner.as_str())
        .bind(collection)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|row| parse_body(&row.doc_id, &row.body).map(|doc| (row.doc_id, doc)))
            .collect())
    }

    async fn set(
        &self,
        owner: &OwnerId,
        collection: &str,
        doc_id: &str,
        doc: Document,
    ) -> Result<()> {
        let body = serde_json::to_string(&doc)?;
        upsert(&self.pool, owner, collection, doc_id, &body, Utc::now()).await?;

        tracing::debug!("Wrote document {}/{}", collection, doc_id);
        Ok(())
    }

    async fn set_merge(
        &self,
        owner: &OwnerId,
        collection: &str,
        doc_id: &str,
        fields: Document,
    ) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        let existing: Option<String> = sqlx::query_scalar(
            "SELECT body FROM documents WHERE owner_id = ? AND collection = ? AND doc_id = ?",
        )
        .bind(owner.as_str())
        .bind(collection)
        .bind(doc_id)
        .fetch_optional(&mut *tx)
        .await?;

        // an unreadable body is replaced by the merged fields
        let mut doc = existing
            .and_then(|body| parse_body(doc_id, &body))
            .unwrap_or_default();
        merge_documents(&mut doc, fields);

        let body = serde_json::to_string(&doc)?;
        upsert(&mut *tx, owner, collection, doc_id, &body, Utc::now()).await?;
        tx.commit().await?;

        tracing::debug!("Merged fields into document {}/{}", collection, doc_id);
        Ok(())
    }

    async fn delete(&self, owner: &OwnerId, collection: &str, doc_id: &str) -> Result<()> {
        let rows = sqlx::query(
            "DELETE FROM documents WHERE owner_id = ? AND collection = ? AND doc_id = ?",
        )
        .bind(owner.as_str())
        .bind(collection)
        .bind(doc_id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        if rows == 0 {
            return Err(AppError::NotFound(doc_id.to_string()));
        }

        tracing::debug!("Deleted document {}/{}", collection, doc_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::initialize_database;
    use serde_json::json;
    use sqlx::sqlite::SqlitePoolOptions;

    async fn create_test_gateway() -> SqliteGateway {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();

        initialize_database(&pool).await.unwrap();
        SqliteGateway::new(pool)
    }

    fn owner(id: &str) -> OwnerId {
        OwnerId::new(id).unwrap()
    }

    fn body(value: serde_json::Value) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_set_get_and_overwrite() {
        let gateway = create_test_gateway().await;
        let alice = owner("alice");

        gateway
            .set(&alice, "SavedRecipes", "r1", body(json!({ "title": "Pasta", "summary": "x" })))
            .await
            .unwrap();
        gateway
            .set(&alice, "SavedRecipes", "r1", body(json!({ "title": "Penne" })))
            .await
            .unwrap();

        let doc = gateway.get(&alice, "SavedRecipes", "r1").await.unwrap().unwrap();
        assert_eq!(doc["title"], json!("Penne"));
        assert!(!doc.contains_key("summary"));

        assert!(gateway.get(&alice, "SavedRecipes", "r2").await.unwrap().is_none());
        assert!(gateway.get(&owner("bob"), "SavedRecipes", "r1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_all_is_scoped() {
        let gateway = create_test_gateway().await;
        let alice = owner("alice");

        for id in ["a", "b", "c"] {
            gateway
                .set(&alice, "SavedRecipes", id, body(json!({ "title": id })))
                .await
                .unwrap();
        }
        gateway
            .set(&owner("bob"), "SavedRecipes", "z", body(json!({ "title": "z" })))
            .await
            .unwrap();
        gateway
            .set(&alice, "Users", "alice", body(json!({ "diet": "vegan" })))
            .await
            .unwrap();

        let mut ids: Vec<String> = gateway
            .get_all(&alice, "SavedRecipes")
            .await
            .unwrap()
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        ids.sort();
        assert_eq!(ids, vec!["a", "b", "c"]);

        assert!(gateway.get_all(&owner("carol"), "SavedRecipes").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_set_merge_creates_and_preserves() {
        let gateway = create_test_gateway().await;
        let alice = owner("alice");

        gateway
            .set_merge(&alice, "Users", "alice", body(json!({ "diet": "vegan" })))
            .await
            .unwrap();
        gateway
            .set_merge(&alice, "Users", "alice", body(json!({ "email": "a@example.com" })))
            .await
            .unwrap();

        let doc = gateway.get(&alice, "Users", "alice").await.unwrap().unwrap();
        assert_eq!(doc["diet"], json!("vegan"));
        assert_eq!(doc["email"], json!("a@example.com"));
    }

    #[tokio::test]
    async fn test_delete() {
        let gateway = create_test_gateway().await;
        let alice = owner("alice");

        gateway
            .set(&alice, "SavedRecipes", "r1", body(json!({ "title": "Pasta" })))
            .await
            .unwrap();
        gateway.delete(&alice, "SavedRecipes", "r1").await.unwrap();

        assert!(gateway.get(&alice, "SavedRecipes", "r1").await.unwrap().is_none());

        let err = gateway.delete(&alice, "SavedRecipes", "r1").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_unreadable_body_is_not_found_and_skipped() {
        let gateway = create_test_gateway().await;
        let alice = owner("alice");

        gateway
            .set(&alice, "SavedRecipes", "good", body(json!({ "title": "Pasta" })))
            .await
            .unwrap();
        for (doc_id, raw) in [("bad", "[1,2]"), ("worse", "not json")] {
            sqlx::query(
                "INSERT INTO documents (owner_id, collection, doc_id, body, created_at, updated_at)
                 VALUES ('alice', 'SavedRecipes', ?, ?, '2024-01-01', '2024-01-01')",
            )
            .bind(doc_id)
            .bind(raw)
            .execute(gateway.pool())
            .await
            .unwrap();
        }

        let err = gateway.get(&alice, "SavedRecipes", "bad").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(id) if id == "bad"));

        let all = gateway.get_all(&alice, "SavedRecipes").await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].0, "good");
    }

    #[tokio::test]
    async fn test_recipes_service_skips_unreadable_rows() {
        use crate::database::Recipe;
        use crate::services::RecipesService;
        use std::sync::Arc;

        let gateway = create_test_gateway().await;
        let alice = owner("alice");
        let service = RecipesService::new(Arc::new(gateway.clone()));

        let id = service
            .save(
                &alice,
                &Recipe {
                    title: "Pasta".to_string(),
                    ..Recipe::new_custom()
                },
                None,
            )
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO documents (owner_id, collection, doc_id, body, created_at, updated_at)
             VALUES ('alice', 'SavedRecipes', 'bad', '[1,2]', '2024-01-01', '2024-01-01')",
        )
        .execute(gateway.pool())
        .await
        .unwrap();

        let err = service.load_one(&alice, "bad").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));

        let records = service.load_all(&alice).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].remote_id.as_deref(), Some(id.as_str()));
    }
}
