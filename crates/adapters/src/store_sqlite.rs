//! SQLite store implementation

use async_trait::async_trait;
use sqlx::{Sqlite, SqlitePool, Transaction, sqlite::SqlitePoolOptions};
use std::path::Path;
use tootbridge_domain::{Collection, Post, Store, StoreError};

/// SQLite-backed store; each collection is one row holding a JSON array
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Create a new SQLite store, initializing the database if needed
    pub async fn new(db_path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let db_path = db_path.as_ref();

        // Create parent directories if needed
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let db_url = format!("sqlite:{}?mode=rwc", db_path.display());

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&db_url)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    /// Create an in-memory SQLite store (for testing)
    pub async fn in_memory() -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS collections (
                name TEXT PRIMARY KEY,
                body TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    async fn upsert(
        tx: &mut Transaction<'_, Sqlite>,
        collection: Collection,
        posts: &[Post],
    ) -> Result<(), StoreError> {
        let body = serde_json::to_string(posts)?;

        sqlx::query(
            r#"
            INSERT INTO collections (name, body)
            VALUES (?, ?)
            ON CONFLICT(name) DO UPDATE SET body = excluded.body
            "#,
        )
        .bind(collection.name())
        .bind(&body)
        .execute(&mut **tx)
        .await
        .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn read(&self, collection: Collection) -> Result<Option<Vec<Post>>, StoreError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT body FROM collections WHERE name = ?")
            .bind(collection.name())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        match row {
            Some((body,)) => Ok(Some(serde_json::from_str(&body)?)),
            None => Ok(None),
        }
    }

    async fn write(&self, collection: Collection, posts: Vec<Post>) -> Result<(), StoreError> {
        self.write_batch(vec![(collection, posts)]).await
    }

    async fn write_batch(&self, batch: Vec<(Collection, Vec<Post>)>) -> Result<(), StoreError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        for (collection, posts) in &batch {
            Self::upsert(&mut tx, *collection, posts).await?;
        }

        tx.commit()
            .await
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn ready(id: u64) -> Post {
        Post::draft(id, format!("https://example.org/{}", id)).with_text("hello")
    }

    #[tokio::test]
    async fn test_unwritten_collection_is_absent() {
        let store = SqliteStore::in_memory().await.unwrap();

        assert!(store.read(Collection::Posts).await.unwrap().is_none());
        assert!(store.read(Collection::Archived).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_write_replaces_collection() {
        let store = SqliteStore::in_memory().await.unwrap();

        store
            .write(Collection::Posts, vec![Post::draft(1, "a"), Post::draft(2, "b")])
            .await
            .unwrap();
        store
            .write(Collection::Posts, vec![Post::draft(3, "c")])
            .await
            .unwrap();

        let posts = store.read(Collection::Posts).await.unwrap().unwrap();
        assert_eq!(posts, vec![Post::draft(3, "c")]);
        assert!(store.read(Collection::Archived).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_write_batch_moves_post() {
        let store = SqliteStore::in_memory().await.unwrap();
        store
            .write(Collection::Posts, vec![ready(1)])
            .await
            .unwrap();

        store
            .write_batch(vec![
                (Collection::Posts, vec![]),
                (Collection::Archived, vec![ready(1)]),
            ])
            .await
            .unwrap();

        assert_eq!(store.read(Collection::Posts).await.unwrap(), Some(vec![]));
        assert_eq!(
            store.read(Collection::Archived).await.unwrap(),
            Some(vec![ready(1)])
        );
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = TempDir::new().expect("temp dir");
        let path = dir.path().join("nested").join("state.sqlite");

        {
            let store = SqliteStore::new(&path).await.unwrap();
            store
                .write(Collection::Archived, vec![ready(5)])
                .await
                .unwrap();
        }

        let store = SqliteStore::new(&path).await.unwrap();
        assert_eq!(
            store.read(Collection::Archived).await.unwrap(),
            Some(vec![ready(5)])
        );
    }
}
