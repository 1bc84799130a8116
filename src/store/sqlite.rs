/// SQLite collection backend
///
/// One row per collection in the `collection` table, holding the JSON
/// document and the time it was last replaced.
use crate::{
    error::PipelineResult,
    store::{Collection, CollectionBackend},
};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Row, SqlitePool};

const UPSERT: &str = r#"
    INSERT INTO collection (name, data, updated_at)
    VALUES (?, ?, ?)
    ON CONFLICT(name) DO UPDATE SET
        data = excluded.data,
        updated_at = excluded.updated_at
"#;

/// SQLite backend
#[derive(Clone)]
pub struct SqliteBackend {
    db: SqlitePool,
}

impl SqliteBackend {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl CollectionBackend for SqliteBackend {
    async fn load(&self, collection: Collection) -> PipelineResult<Option<String>> {
        let row = sqlx::query("SELECT data FROM collection WHERE name = ?")
            .bind(collection.name())
            .fetch_optional(&self.db)
            .await?;

        Ok(row.map(|row| row.get("data")))
    }

    async fn save(&self, collection: Collection, data: String) -> PipelineResult<()> {
        sqlx::query(UPSERT)
            .bind(collection.name())
            .bind(data)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.db)
            .await?;

        Ok(())
    }

    async fn save_all(&self, writes: Vec<(Collection, String)>) -> PipelineResult<()> {
        let now = Utc::now().to_rfc3339();
        let mut tx = self.db.begin().await?;

        for (collection, data) in writes {
            sqlx::query(UPSERT)
                .bind(collection.name())
                .bind(data)
                .bind(&now)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::store::{tables, EntityStore};
    use sqlx::sqlite::SqlitePoolOptions;
    use std::sync::Arc;

    async fn memory_backend() -> SqliteBackend {
        let db = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        db::run_migrations(&db).await.unwrap();
        SqliteBackend::new(db)
    }

    #[tokio::test]
    async fn test_load_missing_collection() {
        let backend = memory_backend().await;
        assert!(backend.load(Collection::Ideas).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_replaces_document() {
        let backend = memory_backend().await;
        backend
            .save(Collection::AcknowledgedActions, "[\"a\"]".to_string())
            .await
            .unwrap();
        backend
            .save(Collection::AcknowledgedActions, "[\"b\"]".to_string())
            .await
            .unwrap();

        let raw = backend.load(Collection::AcknowledgedActions).await.unwrap();
        assert_eq!(raw.as_deref(), Some("[\"b\"]"));
    }

    #[tokio::test]
    async fn test_save_all_writes_every_collection() {
        let backend = memory_backend().await;
        backend
            .save_all(vec![
                (Collection::Challenges, "[]".to_string()),
                (Collection::KanbanCards, "[]".to_string()),
            ])
            .await
            .unwrap();

        assert_eq!(
            backend.load(Collection::Challenges).await.unwrap().as_deref(),
            Some("[]")
        );
        assert_eq!(
            backend.load(Collection::KanbanCards).await.unwrap().as_deref(),
            Some("[]")
        );
    }

    #[tokio::test]
    async fn test_on_disk_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.sqlite");

        {
            let pool = db::create_pool(&path, db::DatabaseOptions::default())
                .await
                .unwrap();
            db::run_migrations(&pool).await.unwrap();
            let store = EntityStore::new(Arc::new(SqliteBackend::new(pool.clone())));
            let mut acknowledged = store.get(tables::ACKNOWLEDGED_ACTIONS).await.unwrap();
            acknowledged.push("action-idea-ID-0042".to_string());
            store
                .set(tables::ACKNOWLEDGED_ACTIONS, &acknowledged)
                .await
                .unwrap();
            pool.close().await;
        }

        let pool = db::create_pool(&path, db::DatabaseOptions::default())
            .await
            .unwrap();
        db::run_migrations(&pool).await.unwrap();
        let store = EntityStore::new(Arc::new(SqliteBackend::new(pool)));
        let acknowledged = store.get(tables::ACKNOWLEDGED_ACTIONS).await.unwrap();
        assert_eq!(acknowledged, vec!["action-idea-ID-0042".to_string()]);
    }
}
