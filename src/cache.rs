//! Time-bounded in-memory cache.
//!
//! Quotes and FX rates are cached by wall-clock TTL only; writes elsewhere do
//! not invalidate entries, so a value may be stale by up to its TTL. Nothing
//! here is ever persisted.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

/// Default TTL for crypto and meme-token quotes.
pub const QUOTE_TTL: Duration = Duration::from_secs(600);

/// Default TTL for the FX rate used in metal and DEX conversions.
pub const FX_TTL: Duration = Duration::from_secs(3600);

#[derive(Clone)]
pub struct TtlCache<K, V>
where
    K: Eq + Hash + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    inner: Arc<Mutex<HashMap<K, (Instant, V)>>>,
    ttl: Duration,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Send + Sync,
    V: Clone + Send + Sync,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    /// Returns the cached value unless its TTL has elapsed. Expired entries
    /// are dropped on access.
    pub async fn get(&self, key: &K) -> Option<V> {
        let mut cache = self.inner.lock().await;
        match cache.get(key) {
            Some((stamp, value)) if stamp.elapsed() < self.ttl => {
                debug!("Cache HIT");
                Some(value.clone())
            }
            Some(_) => {
                debug!("Cache EXPIRED");
                cache.remove(key);
                None
            }
            None => {
                debug!("Cache MISS");
                None
            }
        }
    }

    pub async fn put(&self, key: K, value: V) {
        let mut cache = self.inner.lock().await;
        debug!("Cache PUT");
        cache.insert(key, (Instant::now(), value));
    }
}
