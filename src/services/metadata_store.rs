//! Media metadata persistence.
//!
//! `MetadataStore` is the narrow lookup interface the delivery path depends
//! on; `SqliteMetadataStore` is the production implementation backed by the
//! shared SQLite pool.

use super::StoreResult;
use crate::models::media_file::{MediaRecord, NewMediaRecord};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::SqlitePool;
use std::sync::Arc;
use uuid::Uuid;

#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Look up a record by its stored name. `None` when no row exists.
    async fn find_by_stored_name(&self, stored_name: &str) -> StoreResult<Option<MediaRecord>>;

    /// Insert a new record, stamping `id` and both timestamps.
    async fn insert(&self, new: NewMediaRecord) -> StoreResult<MediaRecord>;

    /// Cheap connectivity check for readiness probes.
    async fn ping(&self) -> StoreResult<()>;
}

/// SQLite-backed metadata store.
#[derive(Clone)]
pub struct SqliteMetadataStore {
    pub db: Arc<SqlitePool>,
}

impl SqliteMetadataStore {
    pub fn new(db: Arc<SqlitePool>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MetadataStore for SqliteMetadataStore {
    async fn find_by_stored_name(&self, stored_name: &str) -> StoreResult<Option<MediaRecord>> {
        let record = sqlx::query_as::<_, MediaRecord>(
            "SELECT id, stored_name, content_type, size_bytes, owner_id, created_at, updated_at
             FROM media_files
             WHERE stored_name = ?",
        )
        .bind(stored_name)
        .fetch_optional(&*self.db)
        .await?;

        Ok(record)
    }

    async fn insert(&self, new: NewMediaRecord) -> StoreResult<MediaRecord> {
        let now = Utc::now();
        let record = sqlx::query_as::<_, MediaRecord>(
            r#"
            INSERT INTO media_files (
                id, stored_name, content_type, size_bytes, owner_id, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?)
            RETURNING id, stored_name, content_type, size_bytes, owner_id, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&new.stored_name)
        .bind(&new.content_type)
        .bind(new.size_bytes)
        .bind(new.owner_id)
        .bind(now)
        .bind(now)
        .fetch_one(&*self.db)
        .await?;

        Ok(record)
    }

    async fn ping(&self) -> StoreResult<()> {
        let value = sqlx::query_scalar::<_, i64>("SELECT 1")
            .fetch_one(&*self.db)
            .await?;
        if value != 1 {
            return Err(super::StoreError::Unhealthy(format!(
                "unexpected result: {}",
                value
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    async fn store() -> SqliteMetadataStore {
        let pool = db::connect_in_memory().await.unwrap();
        SqliteMetadataStore::new(Arc::new(pool))
    }

    fn new_record(name: &str) -> NewMediaRecord {
        NewMediaRecord {
            stored_name: name.into(),
            content_type: "video/mp4".into(),
            size_bytes: 1000,
            owner_id: None,
        }
    }

    #[tokio::test]
    async fn insert_then_find() {
        let store = store().await;
        let inserted = store.insert(new_record("clip.mp4")).await.unwrap();
        assert_eq!(inserted.created_at, inserted.updated_at);

        let found = store
            .find_by_stored_name("clip.mp4")
            .await
            .unwrap()
            .expect("record should exist");
        assert_eq!(found.id, inserted.id);
        assert_eq!(found.content_type, "video/mp4");
        assert_eq!(found.size_bytes, 1000);
        assert_eq!(found.owner_id, None);
    }

    #[tokio::test]
    async fn missing_name_is_none() {
        let store = store().await;
        assert!(store.find_by_stored_name("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn stored_names_are_unique() {
        let store = store().await;
        store.insert(new_record("dup.mp4")).await.unwrap();
        assert!(store.insert(new_record("dup.mp4")).await.is_err());
    }

    #[tokio::test]
    async fn ping_succeeds() {
        store().await.ping().await.unwrap();
    }
}
