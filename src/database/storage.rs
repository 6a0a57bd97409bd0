// src/database/storage.rs
//
// The storage engine seam. Implementations must execute each write as a
// single atomic statement; the stores above never read a row in order to
// write it back.

use crate::database::models::{CompactBucket, RawValue};
use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[async_trait]
pub trait ValueStorage: Send + Sync {
    /// Create the value tables and their indices if they don't exist.
    async fn init_tables(&self) -> Result<()>;

    /// Insert a new compact row, or append `segment` to the stored blob if
    /// the `(timebucket, indicator_id)` row already exists. Atomic.
    async fn insert_or_append_compact(
        &self,
        timebucket: DateTime<Utc>,
        indicator_id: i32,
        segment: &str,
    ) -> Result<()>;

    /// Insert a raw value, replacing `value` on a `(timestamp, indicator_id)`
    /// conflict. Atomic.
    async fn upsert_raw_value(&self, value: &RawValue) -> Result<()>;

    async fn get_compact_bucket(
        &self,
        timebucket: DateTime<Utc>,
        indicator_id: i32,
    ) -> Result<Option<CompactBucket>>;

    async fn get_raw_value(
        &self,
        timestamp: DateTime<Utc>,
        indicator_id: i32,
    ) -> Result<Option<RawValue>>;
}
