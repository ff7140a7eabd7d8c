//! JetStream key-value buckets and atomic counters.

mod kv_bucket;
mod kv_counter;

pub use kv_bucket::{KvBucket, RateLimitBucket};
pub use kv_counter::KvCounter;
