// src/store/raw.rs
use crate::database::models::{RawValue, Sample};
use crate::database::storage::ValueStorage;
use crate::error::Result;
use crate::store::retry::RetryPolicy;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Point-wise store: one row per `(timestamp, indicator_id)`, last write
/// wins. Values are stored exactly as given, without clamping.
pub struct RawValueStore {
    storage: Arc<dyn ValueStorage>,
    retry: RetryPolicy,
}

impl RawValueStore {
    pub fn new(storage: Arc<dyn ValueStorage>, retry: RetryPolicy) -> Self {
        Self { storage, retry }
    }

    pub async fn upsert(&self, sample: &Sample, indicator_id: i32) -> Result<()> {
        let row = RawValue::from_sample(sample, indicator_id)?;
        self.write(&row).await
    }

    /// Every sample is validated before the first write, so a bad value
    /// rejects the batch without touching storage.
    #[instrument(skip(self, samples))]
    pub async fn upsert_batch<I>(&self, indicator_id: i32, samples: I) -> Result<usize>
    where
        I: IntoIterator<Item = Sample>,
    {
        let rows = samples
            .into_iter()
            .map(|sample| RawValue::from_sample(&sample, indicator_id))
            .collect::<Result<Vec<_>>>()?;

        for row in &rows {
            self.write(row).await?;
        }

        debug!("Upserted {} raw value(s) for indicator {}", rows.len(), indicator_id);
        Ok(rows.len())
    }

    pub async fn get(
        &self,
        timestamp: DateTime<Utc>,
        indicator_id: i32,
    ) -> Result<Option<RawValue>> {
        let storage = &self.storage;
        self.retry
            .run("raw read", move || storage.get_raw_value(timestamp, indicator_id))
            .await
    }

    async fn write(&self, row: &RawValue) -> Result<()> {
        let storage = &self.storage;
        self.retry
            .run("raw upsert", move || storage.upsert_raw_value(row))
            .await
    }
}
