//! In-memory response caching with per-request TTL.
//!
//! Reads with a non-zero [`pipeline::MaxAge`] are cached under the resolved
//! name and the request's controller filter, so a read restricted to one
//! controller is never answered with a body another controller produced. Only
//! successful responses are stored. A cache hit returns a copy of the stored
//! response with [`Response::cached`] set and never reaches the controller.
//!
//! Stored bodies are owned values (`Bytes` is immutable and reference
//! counted), so the copy handed to one caller shares no read position with
//! the copy handed to the next.
//!
//! A successful mutation of a name evicts that name's cached reads under every
//! filter.
//!
//! The cache holds at most a fixed number of entries. When it is full, expired
//! entries are swept before inserting; if none have expired the least recently
//! used entry is dropped.

use std::fmt;
use std::num::NonZeroUsize;

use async_trait::async_trait;
use lru::LruCache;
use parking_lot::Mutex;
use pipeline::{Next, Node, Request, ResourceError, ResourceName, Response};
use tokio::time::Instant;
use tracing::debug;

/// Entry bound used by [`CacheInMemory::new`].
pub const DEFAULT_MAX_ENTRIES: usize = 1000;

/// Resolved name and the request's controller filter.
type CacheKey = (ResourceName, Option<String>);

#[derive(Debug, Clone)]
struct CacheEntry {
    response: Response,
    expires_at: Instant,
}

/// Caches successful read responses in process memory.
pub struct CacheInMemory {
    entries: Mutex<LruCache<CacheKey, CacheEntry>>,
}

impl CacheInMemory {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_ENTRIES)
    }

    /// Creates a cache holding at most `max_entries` responses. Zero is
    /// treated as one.
    pub fn with_capacity(max_entries: usize) -> Self {
        let capacity = NonZeroUsize::MIN.saturating_add(max_entries.saturating_sub(1));
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    pub fn capacity(&self) -> usize {
        self.entries.lock().cap().get()
    }

    /// Number of stored entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Drops every expired entry.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        remove_where(&mut self.entries.lock(), |_, entry| entry.expires_at <= now)
    }

    fn lookup(&self, key: &CacheKey) -> Option<Response> {
        let mut entries = self.entries.lock();
        let entry = entries.get(key)?;
        if entry.expires_at > Instant::now() {
            return Some(entry.response.clone());
        }
        entries.pop(key);
        None
    }

    fn store(&self, key: CacheKey, response: &Response, expires_at: Instant) {
        let entry = CacheEntry {
            response: response.clone(),
            expires_at,
        };
        let mut entries = self.entries.lock();
        if entries.len() >= entries.cap().get() {
            let now = Instant::now();
            let purged = remove_where(&mut entries, |_, cached| cached.expires_at <= now);
            if purged > 0 {
                debug!(purged, "swept expired responses");
            }
        }
        entries.put(key, entry);
    }

    fn evict(&self, name: &ResourceName) {
        let evicted = remove_where(&mut self.entries.lock(), |key, _| key.0 == *name);
        if evicted > 0 {
            debug!(resource = %name, evicted, "evicted cached reads after mutation");
        }
    }
}

impl Default for CacheInMemory {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CacheInMemory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let entries = self.entries.lock();
        f.debug_struct("CacheInMemory")
            .field("len", &entries.len())
            .field("capacity", &entries.cap())
            .finish()
    }
}

/// Pops every entry matching `stale`; returns how many were removed.
fn remove_where<F>(entries: &mut LruCache<CacheKey, CacheEntry>, stale: F) -> usize
where
    F: Fn(&CacheKey, &CacheEntry) -> bool,
{
    let keys: Vec<CacheKey> = entries
        .iter()
        .filter(|(key, entry)| stale(*key, *entry))
        .map(|(key, _)| key.clone())
        .collect();
    for key in &keys {
        entries.pop(key);
    }
    keys.len()
}

#[async_trait]
impl Node for CacheInMemory {
    fn name(&self) -> &'static str {
        "cache_in_memory"
    }

    async fn invoke(&self, request: Request, next: Next<'_>) -> Result<Response, ResourceError> {
        if request.method.is_mutating() {
            let name = request.resource().clone();
            let response = next.run(request).await?;
            if response.exists() {
                self.evict(&name);
            }
            return Ok(response);
        }

        if !request.max_age.is_cacheable() {
            return next.run(request).await;
        }

        let key = (request.resource().clone(), request.controller.clone());
        if let Some(mut hit) = self.lookup(&key) {
            debug!("response cache hit");
            hit.request_id = request.id;
            hit.cached = true;
            return Ok(hit);
        }

        debug!("response cache miss");
        let max_age = request.max_age.as_duration();
        let response = next.run(request).await?;
        if response.exists() {
            self.store(key, &response, Instant::now() + max_age);
        }
        Ok(response)
    }
}
