//! Site data accessor.
//!
//! Reads combine the JSON snapshot on disk with the stored value; writes
//! shallow-merge into the effective document and upsert the result. Reads
//! never fail: a store that is down or empty leaves the snapshot in charge.

use std::{path::PathBuf, sync::Arc};

use serde_json::Value;
use tracing::{info, warn};

use crate::{
    model::{self, sections, ApiError, Document},
    store::{KvStore, StoreError},
};

/// The effective document together with the store revision it was read at.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub document: Document,
    pub revision: i64,
}

pub struct SiteData {
    store: Arc<dyn KvStore>,
    snapshot_file: PathBuf,
    key: String,
}

impl SiteData {
    pub fn new(store: Arc<dyn KvStore>, snapshot_file: PathBuf, key: String) -> Self {
        SiteData {
            store,
            snapshot_file,
            key,
        }
    }

    /// Creates the store's table and reports whether it still needs seeding.
    pub async fn init(&self) -> Result<(), StoreError> {
        self.store.init().await?;
        if self.store.get(&self.key).await?.is_none() {
            info!(key = %self.key, "store has no row yet, serving the snapshot until one is written");
        }
        Ok(())
    }

    async fn read_snapshot(&self) -> Document {
        let text = match tokio::fs::read_to_string(&self.snapshot_file).await {
            Ok(text) => text,
            Err(err) => {
                warn!(path = %self.snapshot_file.display(), "snapshot unreadable: {}", err);
                return Document::new();
            }
        };

        match serde_json::from_str(&text) {
            Ok(Value::Object(document)) => document,
            Ok(_) => {
                warn!(path = %self.snapshot_file.display(), "snapshot is not a json object");
                Document::new()
            }
            Err(err) => {
                warn!(path = %self.snapshot_file.display(), "snapshot is not valid json: {}", err);
                Document::new()
            }
        }
    }

    pub async fn read(&self) -> Snapshot {
        let base = self.read_snapshot().await;

        match self.store.get(&self.key).await {
            Ok(Some(row)) => {
                let stored = match row.value {
                    Value::Object(stored) => stored,
                    other => {
                        warn!(key = %self.key, "stored value is not an object: {}", other);
                        Document::new()
                    }
                };
                Snapshot {
                    document: model::merge_effective(base, stored),
                    revision: row.revision,
                }
            }

            Ok(None) => Snapshot {
                document: base,
                revision: 0,
            },

            Err(err) => {
                warn!(key = %self.key, "store read failed, using snapshot: {}", err);
                Snapshot {
                    document: base,
                    revision: 0,
                }
            }
        }
    }

    /// Shallow-merges `patch` into the effective document and stores it.
    ///
    /// With `expected`, the write only happens if nobody else wrote since
    /// that revision was read.
    pub async fn write(&self, patch: Document, expected: Option<i64>) -> Result<Snapshot, ApiError> {
        let current = self.read().await;
        if let Some(expected) = expected {
            if expected != current.revision {
                return Err(ApiError::Conflict {
                    expected,
                    current: current.revision,
                });
            }
        }

        let document = model::merge_patch(current.document, patch);
        for violation in sections::check_conventions(&document) {
            warn!(key = %self.key, "{:?}", violation);
        }

        let revision = self
            .store
            .put(&self.key, &Value::Object(document.clone()), expected)
            .await
            .map_err(conflict_to_api)?;

        info!(key = %self.key, revision, "site data updated");
        Ok(Snapshot { document, revision })
    }

    /// Replaces the stored value wholesale, bypassing any merge.
    pub async fn restore(&self, data: &Value) -> Result<i64, ApiError> {
        self.store.init().await?;
        let revision = self.store.put(&self.key, data, None).await?;
        info!(key = %self.key, revision, "site data restored");
        Ok(revision)
    }
}

fn conflict_to_api(err: StoreError) -> ApiError {
    match err {
        StoreError::Conflict { expected, current } => ApiError::Conflict { expected, current },
        other => ApiError::Store(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, Revisioned};
    use async_trait::async_trait;
    use serde_json::json;

    struct DownStore;

    #[async_trait]
    impl KvStore for DownStore {
        async fn init(&self) -> Result<(), StoreError> {
            Err(StoreError::Unavailable(String::from("connection refused")))
        }

        async fn get(&self, _: &str) -> Result<Option<Revisioned>, StoreError> {
            Err(StoreError::Unavailable(String::from("connection refused")))
        }

        async fn put(&self, _: &str, _: &Value, _: Option<i64>) -> Result<i64, StoreError> {
            Err(StoreError::Unavailable(String::from("connection refused")))
        }
    }

    fn site(store: Arc<dyn KvStore>, snapshot: &Value) -> (SiteData, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("site-data.json");
        std::fs::write(&path, serde_json::to_string_pretty(snapshot).unwrap()).unwrap();
        (SiteData::new(store, path, String::from("site_data")), dir)
    }

    fn doc(value: Value) -> Document {
        serde_json::from_value(value).unwrap()
    }

    #[tokio::test]
    async fn missing_snapshot_reads_empty() {
        let site = SiteData::new(
            Arc::new(MemoryStore::new()),
            PathBuf::from("/nonexistent/site-data.json"),
            String::from("site_data"),
        );
        assert_eq!(site.read().await.document, Document::new());
    }

    #[tokio::test]
    async fn store_outage_serves_snapshot() {
        let snapshot = json!({"hero": {"title": "A"}, "testimonials": [{"id": 1}]});
        let (site, _dir) = site(Arc::new(DownStore), &snapshot);

        let read = site.read().await;
        assert_eq!(Value::Object(read.document), snapshot);
        assert_eq!(read.revision, 0);
    }

    #[tokio::test]
    async fn store_outage_fails_writes() {
        let (site, _dir) = site(Arc::new(DownStore), &json!({}));

        let err = site.write(doc(json!({"hero": {}})), None).await.unwrap_err();
        assert!(matches!(err, ApiError::Store(StoreError::Unavailable(_))));
    }

    #[tokio::test]
    async fn write_merges_over_effective_document() {
        let store = Arc::new(MemoryStore::new());
        let (site, _dir) = site(
            store.clone(),
            &json!({"hero": {"title": "A", "imageUrl": "/a.png"}, "book": {"title": "B"}}),
        );

        let written = site
            .write(doc(json!({"hero": {"title": "C"}})), None)
            .await
            .unwrap();
        assert_eq!(written.revision, 1);
        assert_eq!(
            Value::Object(written.document),
            json!({"hero": {"title": "C"}, "book": {"title": "B"}})
        );

        // the snapshot's imageUrl comes back on read: merge is deeper there
        let read = site.read().await;
        assert_eq!(read.document["hero"], json!({"title": "C", "imageUrl": "/a.png"}));
    }

    #[tokio::test]
    async fn round_trip_is_stable() {
        let store = Arc::new(MemoryStore::new());
        let (site, _dir) = site(
            store.clone(),
            &json!({"hero": {"title": "A"}, "newsArticles": [{"id": 1, "slug": "a"}]}),
        );
        store
            .put("site_data", &json!({"hero": {"x": 1}, "newsArticles": []}), None)
            .await
            .unwrap();

        let before = site.read().await;
        site.write(before.document.clone(), None).await.unwrap();
        let after = site.read().await;

        assert_eq!(before.document, after.document);
        assert_eq!(after.revision, before.revision + 1);
    }

    #[tokio::test]
    async fn stale_revision_writes_nothing() {
        let store = Arc::new(MemoryStore::new());
        let (site, _dir) = site(store.clone(), &json!({}));

        site.write(doc(json!({"hero": {"title": "first"}})), Some(0))
            .await
            .unwrap();
        let err = site
            .write(doc(json!({"hero": {"title": "second"}})), Some(0))
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Conflict { expected: 0, current: 1 }));
        assert_eq!(site.read().await.document["hero"], json!({"title": "first"}));
    }

    #[tokio::test]
    async fn restore_skips_merge() {
        let store = Arc::new(MemoryStore::new());
        let (site, _dir) = site(store.clone(), &json!({}));
        site.write(doc(json!({"footer": {"logoText": "old"}})), None)
            .await
            .unwrap();

        let revision = site.restore(&json!({"hero": {"title": "restored"}})).await.unwrap();

        assert_eq!(revision, 2);
        let row = store.get("site_data").await.unwrap().unwrap();
        assert_eq!(row.value, json!({"hero": {"title": "restored"}}));
    }
}
