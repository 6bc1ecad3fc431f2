use std::{path::PathBuf, sync::Arc};

use axum_test::TestServer;
use serde_json::Value;
use tempfile::TempDir;

use authorsite::api::{self, AppState, Uploads};
use authorsite::site::SiteData;
use authorsite::store::{KvStore, MemoryStore};

pub const SECRET: &str = "test-restore-secret";

/// A router over an in-memory store, a snapshot file and an upload
/// directory, all living in a temporary directory dropped with the env.
pub struct TestEnv {
    _dir: TempDir,
    pub store: Arc<dyn KvStore>,
    pub uploads: PathBuf,
    pub server: TestServer,
}

impl TestEnv {
    pub fn start(snapshot: &Value) -> Self {
        Self::with_store(snapshot, Arc::new(MemoryStore::new()))
    }

    pub fn with_store(snapshot: &Value, store: Arc<dyn KvStore>) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let snapshot_file = dir.path().join("site-data.json");
        std::fs::write(&snapshot_file, serde_json::to_vec_pretty(snapshot).unwrap())
            .expect("Failed to write snapshot");

        let uploads = dir.path().join("uploads");
        std::fs::create_dir(&uploads).expect("Failed to create upload dir");

        let state = AppState {
            site: Arc::new(SiteData::new(
                store.clone(),
                snapshot_file,
                String::from("site_data"),
            )),
            uploads: Arc::new(Uploads {
                dir: uploads.clone(),
                url_prefix: String::from("/uploads"),
                max_bytes: None,
            }),
            restore_secret: Some(Arc::from(SECRET)),
        };

        let server = TestServer::new(api::router(state)).expect("Failed to build test server");

        TestEnv {
            _dir: dir,
            store,
            uploads,
            server,
        }
    }

    pub async fn stored(&self) -> Option<Value> {
        self.store
            .get("site_data")
            .await
            .expect("store read failed")
            .map(|row| row.value)
    }
}
