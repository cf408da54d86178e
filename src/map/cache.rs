use std::num::NonZeroUsize;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;

use crate::core::error::Result;
use crate::map::factory::MapFactory;

struct CachedInstance {
    factory: Arc<MapFactory>,
    last_access: Instant,
}

/// Access-ordered bounded cache of open map factories keyed by logical
/// name. Bounds the number of simultaneously open volumes when many
/// logical maps exist (per-partition storage).
///
/// Eviction is synchronous with the triggering access: entries idle past
/// the window are flushed and closed inline, and capacity overflow pops
/// the least-recently-used entry the same way. No background thread.
pub struct MapInstanceCache {
    entries: Mutex<LruCache<String, CachedInstance>>,
    idle_window: Duration,
    pub hit_count: AtomicUsize,
    pub miss_count: AtomicUsize,
}

impl MapInstanceCache {
    pub fn new(capacity: usize, idle_window: Duration) -> Self {
        let cap = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::new(200).unwrap());
        MapInstanceCache {
            entries: Mutex::new(LruCache::new(cap)),
            idle_window,
            hit_count: AtomicUsize::new(0),
            miss_count: AtomicUsize::new(0),
        }
    }

    /// Fetch a live factory, refreshing its recency.
    pub fn get(&self, name: &str) -> Result<Option<Arc<MapFactory>>> {
        let mut entries = self.entries.lock();
        self.evict_idle(&mut entries)?;
        match entries.get_mut(name) {
            Some(cached) => {
                cached.last_access = Instant::now();
                self.hit_count.fetch_add(1, Ordering::Relaxed);
                Ok(Some(Arc::clone(&cached.factory)))
            }
            None => {
                self.miss_count.fetch_add(1, Ordering::Relaxed);
                Ok(None)
            }
        }
    }

    /// Register a live factory, evicting the least-recent entry if the
    /// cache is full.
    pub fn put(&self, name: String, factory: Arc<MapFactory>) -> Result<()> {
        let mut entries = self.entries.lock();
        self.evict_idle(&mut entries)?;
        let cached = CachedInstance {
            factory,
            last_access: Instant::now(),
        };
        if let Some((_, displaced)) = entries.push(name, cached) {
            close_instance(&displaced)?;
        }
        Ok(())
    }

    /// Drop one entry explicitly, flushing and closing it.
    pub fn remove(&self, name: &str) -> Result<()> {
        let removed = self.entries.lock().pop(name);
        if let Some(cached) = removed {
            close_instance(&cached)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    fn evict_idle(&self, entries: &mut LruCache<String, CachedInstance>) -> Result<()> {
        while let Some((_, cached)) = entries.peek_lru() {
            if cached.last_access.elapsed() <= self.idle_window {
                break;
            }
            let (_, cached) = entries.pop_lru().expect("tail exists");
            close_instance(&cached)?;
        }
        Ok(())
    }
}

fn close_instance(cached: &CachedInstance) -> Result<()> {
    cached.factory.commit()?;
    cached.factory.close()
}
