#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

/// Tracing target for NATS client operations.
pub const TRACING_TARGET_CLIENT: &str = "arcanum_nats::client";

/// Tracing target for key-value bucket and counter operations.
pub const TRACING_TARGET_KV: &str = "arcanum_nats::kv";

/// Tracing target for connection establishment and health.
pub const TRACING_TARGET_CONNECTION: &str = "arcanum_nats::connection";

mod client;
mod error;
pub mod kv;

pub use async_nats::jetstream;
pub use client::{NatsClient, NatsConfig};
pub use error::{Error, Result};
