use async_trait::async_trait;
use serde_json::Value;

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// A stored value and the number of writes it has seen.
#[derive(Debug, Clone, PartialEq)]
pub struct Revisioned {
    pub value: Value,
    pub revision: i64,
}

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("database: {0}")]
    Database(#[from] sqlx::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("revision {expected} is stale, current is {current}")]
    Conflict { expected: i64, current: i64 },
}

/// One JSON value per key.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Creates whatever the store needs; safe to call on every start.
    async fn init(&self) -> Result<(), StoreError>;

    async fn get(&self, key: &str) -> Result<Option<Revisioned>, StoreError>;

    /// Insert-or-replace. With `expected`, only writes when the current
    /// revision matches (0 meaning no row yet). Returns the new revision.
    async fn put(&self, key: &str, value: &Value, expected: Option<i64>)
        -> Result<i64, StoreError>;
}
