//! Keyed read cache with prefix invalidation.
//!
//! Reads are memoised per [`QueryKey`]; concurrent reads of the same key share one fetch.
//! Mutations call [`QueryCache::invalidate`] with a key prefix, which drops every matching
//! entry and notifies subscribers so the next read goes back to the gateway.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{broadcast, OnceCell};
use tracing::debug;

const INVALIDATION_CAPACITY: usize = 64;

type Slot = Arc<OnceCell<Arc<dyn Any + Send + Sync>>>;

/// Tuple-like cache key, e.g. `["service-provider-profile", user_id, service_type]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey(Vec<String>);

impl QueryKey {
    pub fn new<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(parts.into_iter().map(Into::into).collect())
    }

    pub fn parts(&self) -> &[String] {
        &self.0
    }

    pub fn starts_with(&self, prefix: &QueryKey) -> bool {
        self.0.starts_with(&prefix.0)
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    #[error("cached value for {key} was stored with a different type")]
    TypeMismatch { key: QueryKey },
}

/// Process-wide read cache shared by the workflow services.
pub struct QueryCache {
    entries: Mutex<HashMap<QueryKey, Slot>>,
    mutations: Arc<Mutex<HashMap<String, usize>>>,
    invalidations: broadcast::Sender<QueryKey>,
}

impl Default for QueryCache {
    fn default() -> Self {
        let (invalidations, _) = broadcast::channel(INVALIDATION_CAPACITY);
        Self {
            entries: Mutex::new(HashMap::new()),
            mutations: Arc::new(Mutex::new(HashMap::new())),
            invalidations,
        }
    }
}

impl fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QueryCache")
            .field("entries", &lock(&self.entries).len())
            .finish()
    }
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached value for `key`, running `fetcher` only when nothing is cached.
    ///
    /// A failed fetch caches nothing and leaves no entry behind; the next caller retries.
    pub async fn fetch<T, E, F, Fut>(&self, key: QueryKey, fetcher: F) -> Result<Arc<T>, E>
    where
        T: Send + Sync + 'static,
        E: From<CacheError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let slot = lock(&self.entries).entry(key.clone()).or_default().clone();

        let fetched = slot
            .get_or_try_init(|| {
                debug!(%key, "query cache miss");
                let pending = fetcher();
                async move {
                    let value = pending.await?;
                    Ok::<_, E>(Arc::new(value) as Arc<dyn Any + Send + Sync>)
                }
            })
            .await;
        let value = match fetched {
            Ok(value) => value.clone(),
            Err(err) => {
                self.discard_empty_slot(&key, &slot);
                return Err(err);
            }
        };

        value
            .downcast::<T>()
            .map_err(|_| CacheError::TypeMismatch { key }.into())
    }

    /// Remove `slot` from the map if it is still the entry for `key` and holds nothing.
    fn discard_empty_slot(&self, key: &QueryKey, slot: &Slot) {
        let mut entries = lock(&self.entries);
        let stale = entries
            .get(key)
            .is_some_and(|current| Arc::ptr_eq(current, slot) && !current.initialized());
        if stale {
            entries.remove(key);
        }
    }

    /// Cached value for `key` if present and of type `T`, without fetching.
    pub fn peek<T: Send + Sync + 'static>(&self, key: &QueryKey) -> Option<Arc<T>> {
        let slot = lock(&self.entries).get(key).cloned()?;
        let value = slot.get()?.clone();
        value.downcast::<T>().ok()
    }

    pub fn is_cached(&self, key: &QueryKey) -> bool {
        lock(&self.entries)
            .get(key)
            .map(|slot| slot.initialized())
            .unwrap_or(false)
    }

    /// Drop every entry whose key starts with `prefix`, returning how many were dropped.
    ///
    /// Fetches already in flight for a dropped key finish into a detached slot and are
    /// never served again.
    pub fn invalidate(&self, prefix: &QueryKey) -> usize {
        let removed = {
            let mut entries = lock(&self.entries);
            let before = entries.len();
            entries.retain(|key, _| !key.starts_with(prefix));
            before - entries.len()
        };
        debug!(%prefix, removed, "query cache invalidated");
        // No subscribers is fine.
        let _ = self.invalidations.send(prefix.clone());
        removed
    }

    /// Receive every invalidated prefix from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<QueryKey> {
        self.invalidations.subscribe()
    }

    /// Mark the named mutation as in flight until the guard drops.
    pub fn begin_mutation(&self, name: &str) -> MutationGuard {
        *lock(&self.mutations).entry(name.to_string()).or_insert(0) += 1;
        MutationGuard {
            name: name.to_string(),
            registry: Arc::clone(&self.mutations),
        }
    }

    pub fn is_mutating(&self, name: &str) -> bool {
        lock(&self.mutations)
            .get(name)
            .map(|count| *count > 0)
            .unwrap_or(false)
    }
}

/// Pending-state handle returned by [`QueryCache::begin_mutation`].
#[derive(Debug)]
pub struct MutationGuard {
    name: String,
    registry: Arc<Mutex<HashMap<String, usize>>>,
}

impl Drop for MutationGuard {
    fn drop(&mut self) {
        let mut registry = lock(&self.registry);
        if let Some(count) = registry.get_mut(&self.name) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                registry.remove(&self.name);
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}
