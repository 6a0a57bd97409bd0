// src/codec/value.rs
//
// Numeric normalization and the text format of one day's samples:
//
//     blob  := "" | entry+
//     entry := offset ":" value ","
//
// e.g. "0:1.0,953:3.5," is minute 0 = 1.0 and minute 953 (15:53) = 3.5.
// Entries are never sorted or deduplicated; a decode folds them left to
// right so the last occurrence of an offset wins.

use crate::codec::bucket::{offset_instant, MAX_OFFSET};
use crate::error::{Result, StoreError};
use chrono::{DateTime, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Fractional digits kept after rounding.
pub const VALUE_SCALE: u32 = 3;

/// One `(offset, value)` pair of a day bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueUnit {
    /// Minutes since midnight of the bucket, `0..=1439`
    pub offset: u16,
    pub value: Decimal,
}

impl ValueUnit {
    pub fn new(offset: u16, value: Decimal) -> Self {
        Self { offset, value }
    }
}

impl fmt::Display for ValueUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.offset, self.value)
    }
}

/// Clamp-and-round policy for compacted values.
///
/// Values closer to zero than `min_val` are pushed out to `±min_val` (zero
/// itself is kept), then rounded to 3 decimal places with round-half-to-even.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueCodec {
    min_val: Decimal,
}

impl ValueCodec {
    /// `min_val` must be at least 0.001 and carry no more than 3 fractional
    /// digits, otherwise rounding could pull a clamped value back to zero.
    pub fn new(min_val: Decimal) -> Result<Self> {
        if min_val < Decimal::new(1, VALUE_SCALE) {
            return Err(StoreError::invalid(format!(
                "min_val must be at least 0.001, got {}",
                min_val
            )));
        }
        if min_val.normalize().scale() > VALUE_SCALE {
            return Err(StoreError::invalid(format!(
                "min_val must have at most {} fractional digits, got {}",
                VALUE_SCALE, min_val
            )));
        }
        Ok(Self { min_val })
    }

    pub fn min_val(&self) -> Decimal {
        self.min_val
    }

    pub fn clamp_and_round(&self, value: Decimal) -> Decimal {
        let clamped = if value > Decimal::ZERO {
            value.max(self.min_val)
        } else if value < Decimal::ZERO {
            value.min(-self.min_val)
        } else {
            Decimal::ZERO
        };

        canonical(clamped.round_dp_with_strategy(VALUE_SCALE, RoundingStrategy::MidpointNearestEven))
    }

    /// Convert a float sample and apply [`clamp_and_round`](Self::clamp_and_round).
    pub fn normalize_sample(&self, value: f64) -> Result<Decimal> {
        let decimal = to_decimal(value)?;

        // Magnitudes below the decimal resolution convert to zero; the sign
        // still comes from the float
        if decimal.is_zero() && value != 0.0 {
            let floor = if value > 0.0 { self.min_val } else { -self.min_val };
            return Ok(self.clamp_and_round(floor));
        }

        Ok(self.clamp_and_round(decimal))
    }
}

// Trailing zeros stripped, but always at least one fractional digit: 2 -> "2.0"
fn canonical(value: Decimal) -> Decimal {
    let mut value = value.normalize();
    if value.scale() == 0 {
        value.rescale(1);
    }
    value
}

/// Float to decimal, rejecting NaN, infinities and values outside the
/// decimal range.
pub fn to_decimal(value: f64) -> Result<Decimal> {
    if !value.is_finite() {
        return Err(StoreError::invalid(format!("non-finite value: {}", value)));
    }
    Decimal::from_f64(value)
        .ok_or_else(|| StoreError::invalid(format!("value out of decimal range: {}", value)))
}

/// Serialize pairs in the given order. Empty input encodes to `""`.
pub fn encode(pairs: &[ValueUnit]) -> String {
    pairs.iter().map(|unit| format!("{},", unit)).collect()
}

/// Parse every entry of a blob, in order. Any bad token rejects the whole
/// blob.
pub fn decode_units(text: &str) -> Result<Vec<ValueUnit>> {
    text.split(',')
        .filter(|token| !token.is_empty())
        .map(parse_unit)
        .collect()
}

/// Decode a blob into absolute instants anchored at `timebucket`. Later
/// entries overwrite earlier ones at the same offset.
pub fn decode(text: &str, timebucket: DateTime<Utc>) -> Result<BTreeMap<DateTime<Utc>, Decimal>> {
    let mut values = BTreeMap::new();
    for unit in decode_units(text)? {
        values.insert(offset_instant(timebucket, unit.offset), unit.value);
    }
    Ok(values)
}

fn parse_unit(token: &str) -> Result<ValueUnit> {
    let mut parts = token.split(':');
    let (offset, value) = match (parts.next(), parts.next(), parts.next()) {
        (Some(offset), Some(value), None) => (offset, value),
        _ => return Err(StoreError::malformed(token, "expected exactly one ':'")),
    };

    if offset.is_empty() || !offset.bytes().all(|b| b.is_ascii_digit()) {
        return Err(StoreError::malformed(token, "offset is not a minute number"));
    }
    let offset: u16 = offset
        .parse()
        .map_err(|_| StoreError::malformed(token, "offset is not a minute number"))?;
    if offset > MAX_OFFSET {
        return Err(StoreError::malformed(
            token,
            format!("offset {} is past the end of the day", offset),
        ));
    }

    let value = Decimal::from_str(value)
        .map_err(|e| StoreError::malformed(token, format!("value is not a decimal: {}", e)))?;

    Ok(ValueUnit { offset, value })
}
