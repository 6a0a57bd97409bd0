// Pure encode/decode for the day-compacted value format
pub mod bucket;
pub mod value;

pub use bucket::{bucket_key, day_bucket, is_day_bucket, minute_offset, offset_instant, MAX_OFFSET};
pub use value::{decode, decode_units, encode, to_decimal, ValueCodec, ValueUnit};
