// Value stores built on top of a `ValueStorage` engine
pub mod compact;
pub mod raw;
pub mod retry;

pub use compact::{CompactValueStore, DayBuckets};
pub use raw::RawValueStore;
pub use retry::RetryPolicy;
