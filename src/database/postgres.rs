use crate::database::models::{CompactBucket, RawValue};
use crate::database::schema;
use crate::database::storage::ValueStorage;
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{postgres::PgPoolOptions, PgPool, Row};
use tracing::{debug, info};

pub struct PostgresManager {
    pool: PgPool,
}

impl PostgresManager {
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await?;

        Ok(Self { pool })
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    // Attach the cascade foreign keys when the indicator table is present
    async fn attach_indicator_foreign_keys(&self) -> Result<()> {
        let row = sqlx::query(schema::INDICATOR_TABLE_EXISTS_PG)
            .fetch_one(&self.pool)
            .await?;
        let exists: bool = row.get(0);

        if !exists {
            info!("indicator table not found, skipping cascade foreign keys");
            return Ok(());
        }

        for statement in schema::ADD_CASCADE_FOREIGN_KEYS_PG {
            let res = sqlx::query(statement).execute(&self.pool).await;

            if let Err(e) = res {
                // It's OK if the constraint already exists
                if !e.to_string().contains("already exists") {
                    return Err(e.into());
                }
            }
        }

        Ok(())
    }
}

#[async_trait]
impl ValueStorage for PostgresManager {
    async fn init_tables(&self) -> Result<()> {
        sqlx::query(schema::CREATE_RAW_VALUES_TABLE_PG)
            .execute(&self.pool)
            .await?;

        sqlx::query(schema::CREATE_COMPACT_VALUES_TABLE_PG)
            .execute(&self.pool)
            .await?;

        for statement in schema::CREATE_INDICES_PG {
            sqlx::query(statement).execute(&self.pool).await?;
        }

        self.attach_indicator_foreign_keys().await?;

        info!("Value tables initialized successfully");
        Ok(())
    }

    async fn insert_or_append_compact(
        &self,
        timebucket: DateTime<Utc>,
        indicator_id: i32,
        segment: &str,
    ) -> Result<()> {
        sqlx::query(schema::INSERT_OR_APPEND_COMPACT_PG)
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
        sqlx::query(schema::UPSERT_RAW_VALUE_PG)
            .bind(value.timestamp)
            .bind(value.value)
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
        let bucket = sqlx::query_as::<_, CompactBucket>(schema::SELECT_COMPACT_BUCKET_PG)
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
        let value = sqlx::query_as::<_, RawValue>(schema::SELECT_RAW_VALUE_PG)
            .bind(timestamp)
            .bind(indicator_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(value)
    }
}
