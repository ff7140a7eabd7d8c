//! Key-value bucket definitions.

/// Static description of a JetStream key-value bucket.
pub trait KvBucket: Send + Sync + 'static {
    /// Bucket name used in NATS KV.
    const NAME: &'static str;

    /// Human-readable description for the bucket.
    const DESCRIPTION: &'static str;
}

/// Bucket holding fixed-window request counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RateLimitBucket;

impl KvBucket for RateLimitBucket {
    const NAME: &'static str = "rate_limits";
    const DESCRIPTION: &'static str = "Fixed-window request counters";
}
