// src/database/sqlite.rs
//
// SQLite backend for local runs and tests. SQLite executes
// `INSERT .. ON CONFLICT DO UPDATE` as one statement under the database write
// lock, which gives the same append guarantee as the PostgreSQL backend.

use crate::database::models::{CompactBucket, RawValue};
use crate::database::schema;
use crate::database::storage::ValueStorage;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

pub struct SqliteManager {
    pool: SqlitePool,
}

impl SqliteManager {
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        Ok(Self { pool })
    }

    /// Private in-memory database. A single connection, since every
    /// `:memory:` connection would otherwise open its own empty database.
    pub async fn new_in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;

        let manager = Self { pool };
        manager.init_tables().await?;
        Ok(manager)
    }
}

fn raw_value_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<RawValue> {
    let text: String = row.try_get("value")?;
    let value = Decimal::from_str(&text).map_err(|e| sqlx::Error::Decode(Box::new(e)))?;

    Ok(RawValue {
        timestamp: row.try_get("timestamp")?,
        value,
        indicator_id: row.try_get("indicator_id")?,
    })
}

#[async_trait]
impl ValueStorage for SqliteManager {
    async fn init_tables(&self) -> Result<()> {
        sqlx::query(schema::CREATE_RAW_VALUES_TABLE_SQLITE)
            .execute(&self.pool)
            .await?;

        sqlx::query(schema::CREATE_COMPACT_VALUES_TABLE_SQLITE)
            .execute(&self.pool)
            .await?;

        for statement in schema::CREATE_INDICES_SQLITE {
            sqlx::query(statement).execute(&self.pool).await?;
        }

        info!("Value tables initialized successfully");
        Ok(())
    }

    async fn insert_or_append_compact(
        &self,
        timebucket: DateTime<Utc>,
        indicator_id: i32,
        segment: &str,
    ) -> Result<()> {
        sqlx::query(schema::INSERT_OR_APPEND_COMPACT_SQLITE)
            .bind(timebucket)
            .bind(segment)
            .bind(indicator_id)
            .execute(&self.pool)
            .await?;

        debug!(
            "Appended {} bytes to bucket {}:{}",
            segment.len(),
            indicator_id,
            timebucket.format("%Y-%m-%d")
        );
        Ok(())
    }

    async fn upsert_raw_value(&self, value: &RawValue) -> Result<()> {
        sqlx::query(schema::UPSERT_RAW_VALUE_SQLITE)
            .bind(value.timestamp)
            .bind(value.value.to_string())
            .bind(value.indicator_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn get_compact_bucket(
        &self,
        timebucket: DateTime<Utc>,
        indicator_id: i32,
    ) -> Result<Option<CompactBucket>> {
        let bucket = sqlx::query_as::<_, CompactBucket>(schema::SELECT_COMPACT_BUCKET_SQLITE)
            .bind(timebucket)
            .bind(indicator_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(bucket)
    }

    async fn get_raw_value(
        &self,
        timestamp: DateTime<Utc>,
        indicator_id: i32,
    ) -> Result<Option<RawValue>> {
        let row = sqlx::query(schema::SELECT_RAW_VALUE_SQLITE)
            .bind(timestamp)
            .bind(indicator_id)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(raw_value_from_row).transpose()
    }
}
