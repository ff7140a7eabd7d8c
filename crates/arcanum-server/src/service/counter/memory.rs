use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::{CounterError, CounterStore};

#[derive(Debug, Clone, Copy)]
struct Entry {
    count: u64,
    expires_at: Instant,
}

/// Process-local counter store.
///
/// Correct for a single instance only; multi-instance deployments use
/// [`NatsCounterStore`](super::NatsCounterStore).
#[derive(Debug, Default)]
pub struct MemoryCounterStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl MemoryCounterStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live keys.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        let entries = self.entries.lock().await;
        entries.values().filter(|e| e.expires_at > now).count()
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn increment(&self, key: &str, window: Duration) -> Result<u64, CounterError> {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        entries.retain(|_, entry| entry.expires_at > now);

        let entry = entries.entry(key.to_owned()).or_insert(Entry {
            count: 0,
            expires_at: now + window,
        });
        entry.count += 1;

        Ok(entry.count)
    }

    async fn ping(&self) -> Result<(), CounterError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[tokio::test]
    async fn increments_per_key() -> anyhow::Result<()> {
        let store = MemoryCounterStore::new();
        let window = Duration::from_secs(60);

        assert_eq!(store.increment("ip:127.0.0.1.1", window).await?, 1);
        assert_eq!(store.increment("ip:127.0.0.1.1", window).await?, 2);
        assert_eq!(store.increment("ip:127.0.0.2.1", window).await?, 1);
        assert_eq!(store.len().await, 2);

        Ok(())
    }

    #[tokio::test]
    async fn expired_keys_restart_at_one() -> anyhow::Result<()> {
        let store = MemoryCounterStore::new();
        let window = Duration::from_millis(20);

        assert_eq!(store.increment("k", window).await?, 1);
        assert_eq!(store.increment("k", window).await?, 2);
        tokio::time::sleep(Duration::from_millis(40)).await;
        assert_eq!(store.increment("k", window).await?, 1);

        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_increments_are_not_lost() -> anyhow::Result<()> {
        let store = Arc::new(MemoryCounterStore::new());
        let window = Duration::from_secs(60);

        let tasks = (0..50).map(|_| {
            let store = Arc::clone(&store);
            tokio::spawn(async move { store.increment("burst", window).await })
        });

        let mut counts = Vec::new();
        for task in tasks {
            counts.push(task.await??);
        }
        counts.sort_unstable();

        assert_eq!(counts, (1..=50).collect::<Vec<u64>>());
        Ok(())
    }
}
