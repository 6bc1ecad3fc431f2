use std::sync::Arc;

use tracing::warn;

pub mod api;
pub mod compat;
pub mod config;
pub mod model;
pub mod site;
pub mod store;
pub mod upload;

use api::{AppState, Uploads};
use config::Config;
use site::SiteData;
use store::{KvStore, MemoryStore, PgStore, StoreError};

/// Wires the store, accessor and upload settings described by `config`.
pub async fn build_state(config: Config) -> Result<AppState, StoreError> {
    let store: Arc<dyn KvStore> = match &config.db.url {
        Some(url) => Arc::new(PgStore::connect_lazy(url, config.db.max_connections)?),
        None => {
            warn!("no database configured, edits are kept in memory only");
            Arc::new(MemoryStore::new())
        }
    };

    let site = SiteData::new(store, config.content.snapshot_file, config.content.key);
    if let Err(err) = site.init().await {
        warn!("store init failed, reads will fall back to the snapshot: {}", err);
    }

    if config.restore.secret.is_none() {
        warn!("no restore secret configured, /api/restore-db is disabled");
    }

    Ok(AppState {
        site: Arc::new(site),
        uploads: Arc::new(Uploads {
            dir: config.uploads.dir.into(),
            url_prefix: config.uploads.url_prefix,
            max_bytes: config.uploads.max_bytes,
        }),
        restore_secret: config.restore.secret.map(Arc::from),
    })
}
