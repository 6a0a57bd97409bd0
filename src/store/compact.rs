// src/store/compact.rs
//
// Day-compacted value store. A batch of samples for one indicator becomes at
// most one write per calendar day; each write either creates the
// `(day, indicator)` row or appends its segment to the stored blob inside the
// storage engine. Nothing here reads a blob in order to write it.

use crate::codec::{bucket_key, encode, is_day_bucket, ValueCodec, ValueUnit, MAX_OFFSET};
use crate::database::models::{CompactBucket, RawValue, Sample};
use crate::database::storage::ValueStorage;
use crate::error::{Result, StoreError};
use crate::store::retry::RetryPolicy;
use crate::utils::measure_time;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Samples grouped by day bucket. Within a day the pairs keep the order in
/// which the samples were supplied.
pub type DayBuckets = BTreeMap<DateTime<Utc>, Vec<ValueUnit>>;

pub struct CompactValueStore {
    storage: Arc<dyn ValueStorage>,
    codec: ValueCodec,
    retry: RetryPolicy,
}

impl CompactValueStore {
    pub fn new(storage: Arc<dyn ValueStorage>, codec: ValueCodec, retry: RetryPolicy) -> Self {
        Self {
            storage,
            codec,
            retry,
        }
    }

    pub fn codec(&self) -> &ValueCodec {
        &self.codec
    }

    /// Clamp/round every sample and group it under its day bucket.
    pub fn bucketize<I>(&self, samples: I) -> Result<DayBuckets>
    where
        I: IntoIterator<Item = Sample>,
    {
        let mut buckets = DayBuckets::new();

        for sample in samples {
            let value = self.codec.normalize_sample(sample.value)?;
            let (day, offset) = bucket_key(sample.timestamp);
            buckets.entry(day).or_default().push(ValueUnit { offset, value });
        }

        Ok(buckets)
    }

    /// Insert or append one day's pairs. Re-sending the same pairs appends a
    /// duplicate segment, which decodes to the same values.
    #[instrument(skip(self, day, pairs), fields(day = %day.format("%Y-%m-%d"), pairs = pairs.len()))]
    pub async fn upsert(
        &self,
        day: DateTime<Utc>,
        indicator_id: i32,
        pairs: &[ValueUnit],
    ) -> Result<()> {
        validate_pairs(day, pairs)?;

        if pairs.is_empty() {
            debug!("No pairs for indicator {}, skipping write", indicator_id);
            return Ok(());
        }

        let segment = encode(pairs);
        let storage = &self.storage;
        let segment = segment.as_str();

        self.retry
            .run("compact append", move || {
                storage.insert_or_append_compact(day, indicator_id, segment)
            })
            .await
    }

    /// Write a batch of samples for one indicator: one append per affected
    /// day. Returns the number of day buckets written.
    #[instrument(skip(self, samples))]
    pub async fn upsert_samples<I>(&self, indicator_id: i32, samples: I) -> Result<usize>
    where
        I: IntoIterator<Item = Sample>,
    {
        let buckets = self.bucketize(samples)?;

        measure_time("compact batch upsert", async {
            for (day, pairs) in &buckets {
                self.upsert(*day, indicator_id, pairs).await?;
            }
            Ok::<(), StoreError>(())
        })
        .await?;

        info!(
            "Wrote {} day bucket(s) for indicator {}",
            buckets.len(),
            indicator_id
        );
        Ok(buckets.len())
    }

    /// Expand a stored bucket into raw values, sorted by timestamp.
    pub fn decode_to_samples(bucket: &CompactBucket) -> Result<Vec<RawValue>> {
        bucket.raw_values()
    }

    pub async fn get_bucket(
        &self,
        indicator_id: i32,
        day: DateTime<Utc>,
    ) -> Result<Option<CompactBucket>> {
        if !is_day_bucket(day) {
            return Err(StoreError::invalid(format!("{} is not a day bucket", day)));
        }

        let storage = &self.storage;
        self.retry
            .run("compact read", move || storage.get_compact_bucket(day, indicator_id))
            .await
    }

    /// Decoded values of one day, or nothing if the bucket doesn't exist.
    pub async fn load_raw_values(
        &self,
        indicator_id: i32,
        day: DateTime<Utc>,
    ) -> Result<Vec<RawValue>> {
        match self.get_bucket(indicator_id, day).await? {
            Some(bucket) => Self::decode_to_samples(&bucket),
            None => Ok(Vec::new()),
        }
    }
}

fn validate_pairs(day: DateTime<Utc>, pairs: &[ValueUnit]) -> Result<()> {
    if !is_day_bucket(day) {
        return Err(StoreError::invalid(format!(
            "{} is not a day bucket (midnight UTC)",
            day
        )));
    }

    if let Some(unit) = pairs.iter().find(|unit| unit.offset > MAX_OFFSET) {
        return Err(StoreError::invalid(format!(
            "offset {} is outside 0..={}",
            unit.offset, MAX_OFFSET
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::sqlite::SqliteManager;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    async fn store() -> CompactValueStore {
        let storage = SqliteManager::new_in_memory().await.unwrap();
        CompactValueStore::new(
            Arc::new(storage),
            ValueCodec::new(dec!(0.1)).unwrap(),
            RetryPolicy::no_retry(),
        )
    }

    fn day() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_bucketize_groups_by_day_in_input_order() {
        let store = store().await;
        let samples = vec![
            Sample::new(Utc.with_ymd_and_hms(2024, 1, 1, 15, 53, 0).unwrap(), 3.5),
            Sample::new(day(), 0.03),
            Sample::new(Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 30).unwrap(), -0.02),
        ];

        let buckets = store.bucketize(samples).unwrap();

        assert_eq!(buckets.len(), 2);
        assert_eq!(
            buckets[&day()],
            vec![ValueUnit::new(953, dec!(3.5)), ValueUnit::new(0, dec!(0.1))]
        );
        assert_eq!(
            buckets[&Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap()],
            vec![ValueUnit::new(0, dec!(-0.1))]
        );
    }

    #[tokio::test]
    async fn test_bucketize_rejects_non_finite_values() {
        let store = store().await;
        let result = store.bucketize(vec![Sample::new(day(), 1.0), Sample::new(day(), f64::NAN)]);
        assert!(matches!(result, Err(StoreError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_upsert_rejects_bad_pairs_before_writing() {
        let store = store().await;
        let noon = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();

        let result = store.upsert(noon, 1, &[ValueUnit::new(0, dec!(1.0))]).await;
        assert!(matches!(result, Err(StoreError::InvalidInput(_))));

        let result = store
            .upsert(day(), 1, &[ValueUnit::new(0, dec!(1.0)), ValueUnit::new(1440, dec!(2.0))])
            .await;
        assert!(matches!(result, Err(StoreError::InvalidInput(_))));

        assert!(store.get_bucket(1, day()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_empty_upsert_creates_no_row() {
        let store = store().await;
        store.upsert(day(), 1, &[]).await.unwrap();
        assert!(store.get_bucket(1, day()).await.unwrap().is_none());
    }
}
