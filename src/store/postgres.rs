use async_trait::async_trait;
use serde_json::Value;
use sqlx::{postgres::PgPoolOptions, types::Json, PgPool};

use super::{KvStore, Revisioned, StoreError};

const SCHEMA: &str = include_str!("../../schema.sql");

/// The `key_value_store` table.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        PgStore { pool }
    }

    /// Connections are opened on first use, so a database that is down at
    /// startup only degrades reads to the snapshot.
    pub fn connect_lazy(url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect_lazy(url)?;
        Ok(PgStore::new(pool))
    }

    async fn current_revision(&self, key: &str) -> Result<i64, StoreError> {
        Ok(self.get(key).await?.map(|row| row.revision).unwrap_or(0))
    }
}

#[async_trait]
impl KvStore for PgStore {
    async fn init(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Revisioned>, StoreError> {
        let row: Option<(Json<Value>, i64)> =
            sqlx::query_as("select value, revision from key_value_store where key = $1")
                .bind(key)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(|(Json(value), revision)| Revisioned { value, revision }))
    }

    async fn put(
        &self,
        key: &str,
        value: &Value,
        expected: Option<i64>,
    ) -> Result<i64, StoreError> {
        let written: Option<i64> = match expected {
            None => Some(
                sqlx::query_scalar(
                    "insert into key_value_store (key, value, revision) values ($1, $2, 1)
                     on conflict (key) do update
                     set value = excluded.value, revision = key_value_store.revision + 1
                     returning revision",
                )
                .bind(key)
                .bind(Json(value))
                .fetch_one(&self.pool)
                .await?,
            ),

            Some(0) => {
                sqlx::query_scalar(
                    "insert into key_value_store (key, value, revision) values ($1, $2, 1)
                     on conflict (key) do update
                     set value = excluded.value, revision = key_value_store.revision + 1
                     where key_value_store.revision = 0
                     returning revision",
                )
                .bind(key)
                .bind(Json(value))
                .fetch_optional(&self.pool)
                .await?
            }

            Some(expected) => {
                sqlx::query_scalar(
                    "update key_value_store set value = $2, revision = revision + 1
                     where key = $1 and revision = $3
                     returning revision",
                )
                .bind(key)
                .bind(Json(value))
                .bind(expected)
                .fetch_optional(&self.pool)
                .await?
            }
        };

        match written {
            Some(revision) => Ok(revision),
            None => Err(StoreError::Conflict {
                expected: expected.unwrap_or(0),
                current: self.current_revision(key).await?,
            }),
        }
    }
}
