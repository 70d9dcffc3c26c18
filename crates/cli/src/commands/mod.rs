//! CLI subcommands

pub mod config;
pub mod doctor;
pub mod posts;
pub mod run;

use anyhow::{Context, Result, bail};
use std::sync::Arc;
use tootbridge_adapters::store::{InMemoryStore, JsonFileStore, SqliteStore};
use tootbridge_domain::Store;

use crate::config::AppConfig;

/// Open the configured store backend
pub(crate) async fn build_store(config: &AppConfig, ephemeral: bool) -> Result<Arc<dyn Store>> {
    if ephemeral {
        tracing::warn!("Using in-memory store; posts are lost on exit");
        return Ok(Arc::new(InMemoryStore::new()));
    }

    let path = &config.store.path;
    match config.store.backend.trim() {
        "json" => Ok(Arc::new(JsonFileStore::new(path))),
        "sqlite" => Ok(Arc::new(SqliteStore::new(path).await.with_context(|| {
            format!("Failed to open SQLite store at {}", path.display())
        })?)),
        other => bail!("Invalid store backend: {}", other),
    }
}
