use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::{KvStore, Revisioned, StoreError};

/// Process-local store, used when no database is configured.
#[derive(Default)]
pub struct MemoryStore {
    rows: RwLock<HashMap<String, Revisioned>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn init(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Revisioned>, StoreError> {
        Ok(self.rows.read().await.get(key).cloned())
    }

    async fn put(
        &self,
        key: &str,
        value: &Value,
        expected: Option<i64>,
    ) -> Result<i64, StoreError> {
        let mut rows = self.rows.write().await;
        let current = rows.get(key).map(|row| row.revision).unwrap_or(0);

        if let Some(expected) = expected {
            if expected != current {
                return Err(StoreError::Conflict { expected, current });
            }
        }

        let revision = current + 1;
        rows.insert(
            key.to_string(),
            Revisioned {
                value: value.clone(),
                revision,
            },
        );
        Ok(revision)
    }
}
