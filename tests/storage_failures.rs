use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use indicator_value_store::codec::{ValueCodec, ValueUnit};
use indicator_value_store::database::{CompactBucket, RawValue, Sample, ValueStorage};
use indicator_value_store::store::{CompactValueStore, RawValueStore, RetryPolicy};
use indicator_value_store::{Result, StoreError};
use parking_lot::Mutex;
use rust_decimal_macros::dec;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
enum Outcome {
    Succeed,
    Transient,
    Fatal,
}

/// Storage engine that fails according to a script, then succeeds and
/// records every write it accepted.
#[derive(Default)]
struct ScriptedStorage {
    script: Mutex<VecDeque<Outcome>>,
    calls: Mutex<u32>,
    appends: Mutex<Vec<(DateTime<Utc>, i32, String)>>,
    raw: Mutex<Vec<RawValue>>,
}

impl ScriptedStorage {
    fn failing(outcomes: &[Outcome]) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(outcomes.iter().copied().collect()),
            ..Self::default()
        })
    }

    fn calls(&self) -> u32 {
        *self.calls.lock()
    }

    fn next(&self) -> Result<()> {
        *self.calls.lock() += 1;
        match self.script.lock().pop_front() {
            None | Some(Outcome::Succeed) => Ok(()),
            Some(Outcome::Transient) => Err(sqlx::Error::PoolTimedOut.into()),
            Some(Outcome::Fatal) => {
                Err(sqlx::Error::Protocol("unexpected column type".to_string()).into())
            }
        }
    }
}

#[async_trait]
impl ValueStorage for ScriptedStorage {
    async fn init_tables(&self) -> Result<()> {
        Ok(())
    }

    async fn insert_or_append_compact(
        &self,
        timebucket: DateTime<Utc>,
        indicator_id: i32,
        segment: &str,
    ) -> Result<()> {
        self.next()?;
        self.appends
            .lock()
            .push((timebucket, indicator_id, segment.to_string()));
        Ok(())
    }

    async fn upsert_raw_value(&self, value: &RawValue) -> Result<()> {
        self.next()?;
        self.raw.lock().push(value.clone());
        Ok(())
    }

    async fn get_compact_bucket(
        &self,
        _timebucket: DateTime<Utc>,
        _indicator_id: i32,
    ) -> Result<Option<CompactBucket>> {
        self.next()?;
        Ok(None)
    }

    async fn get_raw_value(
        &self,
        _timestamp: DateTime<Utc>,
        _indicator_id: i32,
    ) -> Result<Option<RawValue>> {
        self.next()?;
        Ok(None)
    }
}

fn day() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

fn compact_store(storage: Arc<ScriptedStorage>, retry_max: u32) -> CompactValueStore {
    CompactValueStore::new(
        storage,
        ValueCodec::new(dec!(0.1)).unwrap(),
        RetryPolicy::new(retry_max, Duration::from_millis(1)),
    )
}

#[tokio::test]
async fn test_transient_append_failures_are_retried() {
    let storage = ScriptedStorage::failing(&[Outcome::Transient, Outcome::Transient]);
    let store = compact_store(storage.clone(), 3);

    store
        .upsert(day(), 42, &[ValueUnit::new(0, dec!(1.0))])
        .await
        .unwrap();

    assert_eq!(storage.calls(), 3);
    let appends = storage.appends.lock();
    assert_eq!(appends.len(), 1);
    assert_eq!(appends[0], (day(), 42, "0:1.0,".to_string()));
}

#[tokio::test]
async fn test_exhausted_retries_surface_as_retryable() {
    let storage = ScriptedStorage::failing(&[Outcome::Transient; 5]);
    let store = compact_store(storage.clone(), 2);

    let err = store
        .upsert(day(), 42, &[ValueUnit::new(0, dec!(1.0))])
        .await
        .unwrap_err();

    assert!(err.is_retryable());
    assert!(matches!(err, StoreError::TransientStorage { attempts: 3, .. }));
    assert_eq!(storage.calls(), 3);
    assert!(storage.appends.lock().is_empty());
}

#[tokio::test]
async fn test_fatal_errors_propagate_immediately() {
    let storage = ScriptedStorage::failing(&[Outcome::Fatal]);
    let store = compact_store(storage.clone(), 5);

    let err = store
        .upsert(day(), 42, &[ValueUnit::new(0, dec!(1.0))])
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::Fatal(_)));
    assert!(!err.is_retryable());
    assert_eq!(storage.calls(), 1);
}

#[tokio::test]
async fn test_invalid_batch_never_reaches_storage() {
    let storage = ScriptedStorage::failing(&[]);
    let store = compact_store(storage.clone(), 3);

    let err = store
        .upsert_samples(
            42,
            vec![
                Sample::new(day(), 1.0),
                Sample::new(day() + chrono::Duration::hours(1), f64::NAN),
            ],
        )
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::InvalidInput(_)));
    assert_eq!(storage.calls(), 0);
}

#[tokio::test]
async fn test_failed_day_stops_the_batch() {
    // First day lands, second day hits a fatal error
    let storage = ScriptedStorage::failing(&[Outcome::Succeed, Outcome::Fatal]);
    let store = compact_store(storage.clone(), 3);

    let err = store
        .upsert_samples(
            42,
            vec![
                Sample::new(day(), 1.0),
                Sample::new(day() + chrono::Duration::days(1), 2.0),
            ],
        )
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::Fatal(_)));
    let appends = storage.appends.lock();
    assert_eq!(appends.len(), 1);
    assert_eq!(appends[0].0, day());
}

#[tokio::test]
async fn test_raw_upsert_retries_transient_failures() {
    let storage = ScriptedStorage::failing(&[Outcome::Transient]);
    let store = RawValueStore::new(storage.clone(), RetryPolicy::new(1, Duration::from_millis(1)));

    store
        .upsert(&Sample::new(day(), 0.0625), 42)
        .await
        .unwrap();

    assert_eq!(storage.calls(), 2);
    let raw = storage.raw.lock();
    assert_eq!(raw.len(), 1);
    assert_eq!(raw[0].value, dec!(0.0625));
}
