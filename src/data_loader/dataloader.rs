use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::{join_all, BoxFuture, JoinAll};
use tracing::Instrument;

use super::cache::HashMapCache;
use super::config::LoaderConfig;
use super::dispatch::{DataLoaderInner, DispatchGuard};
use super::error::{Error, Result};
use super::loader::Loader;
use super::queue::PendingEntry;
use super::scheduler::{next_tick, Spawner};
use super::slot::LoadFuture;
use super::storage::CacheStorage;

type LoadFutureOf<K, L> = LoadFuture<<L as Loader<K>>::Value, <L as Loader<K>>::Error>;
type Entries<K, L, C> = Vec<PendingEntry<K, C, <L as Loader<K>>::Value, <L as Loader<K>>::Error>>;

enum Action<K, L, C>
where
    K: Send + Sync + 'static,
    L: Loader<K>,
{
    /// Dispatch the entries of this cycle right away.
    ImmediateLoad(u64, Entries<K, L, C>),
    /// First key of a cycle, dispatch it on the next tick.
    StartFetch(u64),
    /// A dispatch for this cycle is already scheduled.
    Delay,
}

/// Data loader.
///
/// Collects the keys requested while resolving one tick of a query and hands
/// them to the [Loader] in a single call. Requests for equal cache keys share
/// one [LoadFuture] until the entry is cleared.
///
/// Reference: <https://github.com/graphql/dataloader>
pub struct DataLoader<K, L, C = K>
where
    K: Send + Sync + 'static,
    L: Loader<K>,
    C: Send + Sync + Clone + Eq + Hash + 'static,
{
    inner: Arc<DataLoaderInner<K, L, C>>,
    cache_key: Box<dyn Fn(&K) -> C + Send + Sync>,
    spawner: Box<dyn Spawner>,
    delay: Duration,
    max_batch_size: usize,
    batch: bool,
    disable_cache: AtomicBool,
}

impl<K, L> DataLoader<K, L, K>
where
    K: Send + Sync + Clone + Eq + Hash + 'static,
    L: Loader<K>,
{
    /// Use `Loader` to create a [DataLoader] that caches by the key itself.
    pub fn new<S, R>(loader: L, spawner: S) -> Self
    where
        S: Fn(BoxFuture<'static, ()>) -> R + Send + Sync + 'static,
    {
        Self::with_cache_key(loader, spawner, K::clone)
    }
}

impl<K, L, C> DataLoader<K, L, C>
where
    K: Send + Sync + 'static,
    L: Loader<K>,
    C: Send + Sync + Clone + Eq + Hash + 'static,
{
    /// Use `Loader` to create a [DataLoader] that caches by `cache_key(key)`.
    pub fn with_cache_key<S, R, F>(loader: L, spawner: S, cache_key: F) -> Self
    where
        S: Fn(BoxFuture<'static, ()>) -> R + Send + Sync + 'static,
        F: Fn(&K) -> C + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(DataLoaderInner::new(loader, Box::new(HashMapCache::new()))),
            cache_key: Box::new(cache_key),
            spawner: Box::new(spawner),
            delay: Duration::ZERO,
            max_batch_size: 0,
            batch: true,
            disable_cache: false.into(),
        }
    }

    /// Specify the delay time before a deferred dispatch, the default is zero,
    /// which waits for a single yield of the scheduler.
    #[must_use]
    pub fn delay(self, delay: Duration) -> Self {
        Self { delay, ..self }
    }

    /// Specify the max batch size for loading data, the default is `0`, which
    /// means unbounded.
    ///
    /// If the keys waiting to be loaded reach the threshold, they are loaded
    /// immediately.
    #[must_use]
    pub fn max_batch_size(self, max_batch_size: usize) -> Self {
        Self { max_batch_size, ..self }
    }

    /// Enable/Disable batching. Without batching every load is dispatched
    /// on its own.
    #[must_use]
    pub fn batch(self, batch: bool) -> Self {
        Self { batch, ..self }
    }

    /// Enable/Disable the cache.
    #[must_use]
    pub fn cache(self, enable: bool) -> Self {
        self.enable_cache(enable);
        self
    }

    /// Replace the cache storage, e.g. with a bounded
    /// [LruCache](super::LruCache) or a map filled in advance.
    #[must_use]
    pub fn cache_map<S>(self, storage: S) -> Self
    where
        S: CacheStorage<Key = C, Value = LoadFutureOf<K, L>>,
    {
        self.inner.state().cache = Box::new(storage);
        self
    }

    /// Apply a [LoaderConfig].
    #[must_use]
    pub fn config(self, config: &LoaderConfig) -> Self {
        self.batch(config.batch)
            .max_batch_size(config.threshold().unwrap_or_default())
            .cache(config.cache)
            .delay(Duration::from_millis(config.delay as u64))
    }

    /// Get the loader.
    #[inline]
    pub fn loader(&self) -> &L {
        &self.inner.loader
    }

    /// Enable/Disable the cache at runtime. Entries cached so far are kept.
    pub fn enable_cache(&self, enable: bool) {
        self.disable_cache.store(!enable, Ordering::SeqCst);
    }

    fn cache_enabled(&self) -> bool {
        !self.disable_cache.load(Ordering::SeqCst)
    }

    /// Use this `DataLoader` to load a value.
    ///
    /// Returns the cached future when the key was requested before, otherwise
    /// queues the key for the next dispatch.
    pub fn load(&self, key: K) -> LoadFutureOf<K, L> {
        let cache_key = self.cache_enabled().then(|| (self.cache_key)(&key));

        let (future, action) = {
            let mut state = self.inner.state();

            if let Some(cache_key) = &cache_key {
                if let Some(future) = state.cache.get(cache_key) {
                    return future.clone();
                }
            }

            let future = state.queue.enqueue(key, cache_key.clone());
            if let Some(cache_key) = cache_key {
                state.cache.insert(cache_key, future.clone());
            }

            let queued = state.queue.len();
            let action = if !self.batch || self.threshold_reached(queued) {
                let cycle = state.queue.cycle();
                Action::ImmediateLoad(cycle, state.queue.drain())
            } else if queued == 1 {
                Action::StartFetch(state.queue.cycle())
            } else {
                Action::Delay
            };

            (future, action)
        };

        self.schedule(action);
        future
    }

    /// Like [DataLoader::load] for keys that may be missing, e.g. a nullable
    /// foreign key of a parent value.
    pub fn try_load(&self, key: Option<K>) -> Result<LoadFutureOf<K, L>, L::Error> {
        key.map(|key| self.load(key)).ok_or(Error::InvalidKey)
    }

    /// Use this `DataLoader` to load some data.
    ///
    /// Every key is queued before this returns, so they all land in the same
    /// batch. The results come back in the order of `keys` and each position
    /// succeeds or fails on its own.
    pub fn load_many<I>(&self, keys: I) -> JoinAll<LoadFutureOf<K, L>>
    where
        I: IntoIterator<Item = K>,
    {
        let futures: Vec<_> = keys.into_iter().map(|key| self.load(key)).collect();
        join_all(futures)
    }

    /// Like [DataLoader::load_many] for inputs that may be missing. Nothing is
    /// queued unless the collection and every key in it are present.
    pub fn try_load_many<I>(&self, keys: Option<I>) -> Result<JoinAll<LoadFutureOf<K, L>>, L::Error>
    where
        I: IntoIterator<Item = Option<K>>,
    {
        let Some(keys) = keys else {
            return Err(Error::InvalidArgument);
        };
        let Some(keys) = keys.into_iter().collect::<Option<Vec<_>>>() else {
            return Err(Error::InvalidKey);
        };

        Ok(self.load_many(keys))
    }

    /// Clears the value at `key` from the cache, if it exists.
    pub fn clear(&self, key: &K) -> &Self {
        let cache_key = (self.cache_key)(key);
        self.inner.state().cache.remove(&cache_key);
        self
    }

    /// Clears the entire cache. Batches already dispatched still settle
    /// their callers.
    pub fn clear_all(&self) -> &Self {
        self.inner.state().cache.clear();
        self
    }

    /// Feed a value into the cache. An existing entry for the key is never
    /// overwritten.
    pub fn prime(&self, key: K, value: L::Value) -> &Self {
        self.prime_many(std::iter::once((key, value)))
    }

    /// Feed some data into the cache. Existing entries are never
    /// overwritten.
    pub fn prime_many<I>(&self, values: I) -> &Self
    where
        I: IntoIterator<Item = (K, L::Value)>,
    {
        let values: Vec<_> = values
            .into_iter()
            .map(|(key, value)| ((self.cache_key)(&key), value))
            .collect();

        let mut state = self.inner.state();
        for (cache_key, value) in values {
            if !state.cache.contains_key(&cache_key) {
                state.cache.insert(cache_key, LoadFuture::ready(Ok(value)));
            }
        }
        drop(state);

        self
    }

    /// Returns `true` if the cache holds a future for `key`.
    pub fn contains_key(&self, key: &K) -> bool {
        let cache_key = (self.cache_key)(key);
        self.inner.state().cache.contains_key(&cache_key)
    }

    /// Number of keys waiting for the next dispatch.
    pub fn queued(&self) -> usize {
        self.inner.state().queue.len()
    }

    /// Gets all successfully loaded values in the cache. Entries still in
    /// flight or settled with an error are left out.
    pub fn get_cached_values(&self) -> HashMap<C, L::Value> {
        let state = self.inner.state();
        state
            .cache
            .iter()
            .filter_map(|(key, future)| match future.try_get() {
                Some(Ok(value)) => Some((key.clone(), value)),
                _ => None,
            })
            .collect()
    }

    fn threshold_reached(&self, queued: usize) -> bool {
        self.max_batch_size > 0 && queued >= self.max_batch_size
    }

    fn schedule(&self, action: Action<K, L, C>) {
        match action {
            Action::ImmediateLoad(cycle, entries) => {
                let inner = self.inner.clone();
                let guard = DispatchGuard::immediate(inner.clone(), &entries);
                let task = async move {
                    inner.dispatch(entries, cycle).await;
                    guard.complete();
                };
                let task = task.instrument(tracing::debug_span!("immediate_load", cycle));

                self.spawner.spawn(Box::pin(task));
            }
            Action::StartFetch(cycle) => {
                let inner = self.inner.clone();
                let mut guard = DispatchGuard::deferred(inner.clone(), cycle);
                let delay = self.delay;
                tracing::debug!(cycle, "scheduling deferred dispatch");

                let task = async move {
                    next_tick(delay).await;

                    if let Some(entries) = guard.take_cycle() {
                        inner.dispatch(entries, cycle).await;
                    }
                    guard.complete();
                };
                let task = task.instrument(tracing::debug_span!("deferred_load", cycle));

                self.spawner.spawn(Box::pin(task));
            }
            Action::Delay => {}
        }
    }
}
