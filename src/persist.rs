//! Periodic durable snapshots of the book registry.
//!
//! Each tick exports a per-symbol consistent copy of the registry,
//! writes it to a staging file, then renames over the durable path so
//! a reader never observes a partially written file. A failed tick is
//! logged and the next tick tries again.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use tokio::sync::{watch, RwLock};
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use crate::book::store::BookStore;
use crate::book::types::PersistedRegistry;
use crate::error::PersistError;

/// Fixed-interval persistence of the registry.
pub struct PersistenceScheduler {
    store: Arc<BookStore>,
    path: PathBuf,
    interval: Duration,
    shutdown: watch::Receiver<bool>,
    last_flush: Arc<RwLock<Option<OffsetDateTime>>>,
}

impl PersistenceScheduler {
    /// Create a scheduler writing to `path` every `interval`.
    pub fn new(
        store: Arc<BookStore>,
        path: impl Into<PathBuf>,
        interval: Duration,
        shutdown: watch::Receiver<bool>,
        last_flush: Arc<RwLock<Option<OffsetDateTime>>>,
    ) -> Self {
        Self {
            store,
            path: path.into(),
            interval,
            shutdown,
            last_flush,
        }
    }

    /// Run until shutdown, then perform one final flush.
    pub async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.flush().await {
                        crate::metrics::inc_persist_failures();
                        error!(path = %self.path.display(), error = %e, "persist tick failed");
                    }
                }
                _ = self.shutdown.changed() => {
                    if let Err(e) = self.flush().await {
                        error!(path = %self.path.display(), error = %e, "final flush failed");
                    }
                    break;
                }
            }
        }

        info!(path = %self.path.display(), "persistence scheduler stopped");
    }

    /// Export the registry and write it durably.
    pub async fn flush(&self) -> Result<(), PersistError> {
        let _timer = crate::metrics::timer_persist_flush();

        // Entry locks only; all I/O happens on the copy.
        let registry = self.store.export();

        write_registry(&self.path, &registry).await?;
        crate::metrics::inc_persist_ticks();

        *self.last_flush.write().await = Some(OffsetDateTime::now_utc());
        Ok(())
    }
}

/// Serialize a registry to `<path>` via write-then-rename.
pub async fn write_registry(path: &Path, registry: &PersistedRegistry) -> Result<(), PersistError> {
    let json = serde_json::to_vec_pretty(registry)?;
    let staging = staging_path(path);

    tokio::fs::write(&staging, &json).await?;
    tokio::fs::rename(&staging, path).await?;

    Ok(())
}

/// Load a persisted registry from disk.
pub async fn load_registry(path: &Path) -> Result<PersistedRegistry, PersistError> {
    let bytes = tokio::fs::read(path).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

/// Staging sibling of the durable path, on the same filesystem so the
/// rename is atomic.
fn staging_path(path: &Path) -> PathBuf {
    let mut staging = path.as_os_str().to_owned();
    staging.push(".tmp");
    PathBuf::from(staging)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::book::types::PersistedBook;
    use std::collections::BTreeMap;

    fn temp_path(name: &str) -> PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("zonewatch-{}-{}.json", name, std::process::id()));
        path
    }

    fn sample_registry() -> PersistedRegistry {
        let mut bids = BTreeMap::new();
        bids.insert("0.12345".to_string(), "1500".to_string());
        let mut asks = BTreeMap::new();
        asks.insert("0.12350".to_string(), "900.5".to_string());

        let mut registry = PersistedRegistry::new();
        registry.insert("DOGEUSDT".to_string(), PersistedBook { bids, asks });
        registry
    }

    #[tokio::test]
    async fn write_then_load_round_trips() {
        let path = temp_path("round-trip");
        let registry = sample_registry();

        write_registry(&path, &registry).await.expect("write");
        let loaded = load_registry(&path).await.expect("load");

        assert_eq!(loaded, registry);
        tokio::fs::remove_file(&path).await.ok();
    }

    #[tokio::test]
    async fn write_leaves_no_staging_file_behind() {
        let path = temp_path("staging");

        write_registry(&path, &sample_registry()).await.expect("write");

        assert!(!staging_path(&path).exists());
        assert!(path.exists());
        tokio::fs::remove_file(&path).await.ok();
    }

    #[tokio::test]
    async fn overwrite_replaces_previous_contents() {
        let path = temp_path("overwrite");

        write_registry(&path, &sample_registry()).await.expect("first write");

        let mut second = PersistedRegistry::new();
        second.insert("XRPUSDT".to_string(), PersistedBook::default());
        write_registry(&path, &second).await.expect("second write");

        let loaded = load_registry(&path).await.expect("load");
        assert!(!loaded.contains_key("DOGEUSDT"));
        assert!(loaded.contains_key("XRPUSDT"));
        tokio::fs::remove_file(&path).await.ok();
    }

    #[tokio::test]
    async fn load_missing_file_errors() {
        let path = temp_path("missing");
        assert!(load_registry(&path).await.is_err());
    }

    #[tokio::test]
    async fn load_corrupt_file_errors() {
        let path = temp_path("corrupt");
        tokio::fs::write(&path, b"{not json").await.expect("write");

        assert!(load_registry(&path).await.is_err());
        tokio::fs::remove_file(&path).await.ok();
    }
}
