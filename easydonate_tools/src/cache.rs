use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use tokio::sync::RwLock;

use crate::data_objects::RemoteProduct;

/// A clock the cache asks for "now". Production uses [`SystemClock`]; tests can inject a manual clock to step
/// time forward deterministically.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

struct CacheEntry {
    expires_at: Instant,
    products: Arc<Vec<RemoteProduct>>,
}

/// A time-expiring catalog cache keyed by EasyDonate server id. Bounds the outbound call volume of the public
/// catalog endpoint; entries simply fall out after the TTL.
pub struct CatalogCache {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: RwLock<HashMap<i64, CacheEntry>>,
}

impl CatalogCache {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self { ttl, clock, entries: RwLock::new(HashMap::new()) }
    }

    pub async fn get(&self, server_id: i64) -> Option<Arc<Vec<RemoteProduct>>> {
        let entries = self.entries.read().await;
        let entry = entries.get(&server_id)?;
        if entry.expires_at > self.clock.now() {
            Some(Arc::clone(&entry.products))
        } else {
            None
        }
    }

    pub async fn put(&self, server_id: i64, products: Vec<RemoteProduct>) -> Arc<Vec<RemoteProduct>> {
        let products = Arc::new(products);
        let entry = CacheEntry { expires_at: self.clock.now() + self.ttl, products: Arc::clone(&products) };
        self.entries.write().await.insert(server_id, entry);
        products
    }
}
