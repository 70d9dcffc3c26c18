//! JSON file store
//!
//! The whole state lives in one JSON document keyed by collection name:
//!
//! ```json
//! { "posts": [{ "id": 1500000000, "url": "https://..." }], "archived": [] }
//! ```
//!
//! Every write re-serializes the document into a temp file next to the target
//! and renames it into place, so a reader never sees a partial document.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tootbridge_domain::{Collection, Post, Store, StoreError};
use uuid::Uuid;

type Document = Map<String, Value>;

/// File-backed store using a single JSON document
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<Document, StoreError> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Document::new()),
            Err(e) => return Err(e.into()),
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Document::new());
        }

        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn persist(&self, document: &Document) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let bytes = serde_json::to_vec_pretty(document)?;
        let tmp_path = self.tmp_path();

        let result = async {
            let mut file = fs::File::create(&tmp_path).await?;
            file.write_all(&bytes).await?;
            file.sync_all().await?;
            fs::rename(&tmp_path, &self.path).await
        }
        .await;

        if let Err(e) = result {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }

        Ok(())
    }

    fn tmp_path(&self) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "data.json".to_string());
        self.path
            .with_file_name(format!(".{}.{}.tmp", file_name, Uuid::new_v4()))
    }
}

#[async_trait]
impl Store for JsonFileStore {
    async fn read(&self, collection: Collection) -> Result<Option<Vec<Post>>, StoreError> {
        let _guard = self.lock.lock().await;
        let mut document = self.load().await?;

        match document.remove(collection.name()) {
            Some(value) => Ok(serde_json::from_value(value)?),
            None => Ok(None),
        }
    }

    async fn write(&self, collection: Collection, posts: Vec<Post>) -> Result<(), StoreError> {
        self.write_batch(vec![(collection, posts)]).await
    }

    async fn write_batch(&self, batch: Vec<(Collection, Vec<Post>)>) -> Result<(), StoreError> {
        let _guard = self.lock.lock().await;
        let mut document = self.load().await?;

        for (collection, posts) in batch {
            document.insert(collection.name().to_string(), serde_json::to_value(posts)?);
        }

        self.persist(&document).await?;

        tracing::debug!(path = %self.path.display(), "Persisted store");
        Ok(())
    }
}
