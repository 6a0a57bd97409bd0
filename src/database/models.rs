// src/database/models.rs
use crate::codec::{decode, to_decimal};
use crate::error::Result;
use crate::utils::format_time;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::fmt;

/// A freshly evaluated sample, as handed over by the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl Sample {
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// One row of `indicatorvalue`, keyed by `(timestamp, indicator_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct RawValue {
    pub timestamp: DateTime<Utc>,
    pub value: Decimal,
    pub indicator_id: i32,
}

impl RawValue {
    /// Build a row from a sample, keeping the caller's exact value.
    pub fn from_sample(sample: &Sample, indicator_id: i32) -> Result<Self> {
        Ok(Self {
            timestamp: sample.timestamp,
            value: to_decimal(sample.value)?,
            indicator_id,
        })
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<indicator value {} | {}: {}>",
            self.indicator_id,
            format_time(&self.timestamp),
            self.value
        )
    }
}

/// One row of `indicatorvaluecompact`: every sample of one indicator for
/// one calendar day, as a `"<offset>:<value>,"` blob.
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct CompactBucket {
    /// Midnight UTC of the day
    pub timebucket: DateTime<Utc>,
    pub values: String,
    pub indicator_id: i32,
}

impl CompactBucket {
    /// Expand the blob into raw values, sorted by timestamp. Duplicate
    /// offsets collapse to their last occurrence.
    pub fn raw_values(&self) -> Result<Vec<RawValue>> {
        let values = decode(&self.values, self.timebucket)?;
        Ok(values
            .into_iter()
            .map(|(timestamp, value)| RawValue {
                timestamp,
                value,
                indicator_id: self.indicator_id,
            })
            .collect())
    }
}

impl fmt::Display for CompactBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<indicator values {} | {} | {} bytes>",
            self.indicator_id,
            self.timebucket.format("%Y-%m-%d"),
            self.values.len()
        )
    }
}
