use std::any::Any;
use std::hash::Hash;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::FutureExt;

use super::error::Error;
use super::loader::Loader;
use super::queue::{PendingEntry, PendingQueue};
use super::slot::{LoadFuture, ResultSlot};
use super::storage::CacheStorage;

pub(crate) type Storage<C, V, E> = Box<dyn CacheStorage<Key = C, Value = LoadFuture<V, E>>>;

type Cached<C, V, E> = Option<(C, LoadFuture<V, E>)>;
type Entries<K, C, V, E> = Vec<PendingEntry<K, C, V, E>>;

pub(crate) struct State<K, C, V, E> {
    pub(crate) cache: Storage<C, V, E>,
    pub(crate) queue: PendingQueue<K, C, V, E>,
}

/// State shared between a [DataLoader](super::DataLoader) and the dispatch
/// tasks it spawns.
pub(crate) struct DataLoaderInner<K, L, C>
where
    K: Send + Sync + 'static,
    L: Loader<K>,
{
    pub(crate) loader: L,
    state: Mutex<State<K, C, L::Value, L::Error>>,
}

impl<K, L, C> DataLoaderInner<K, L, C>
where
    K: Send + Sync + 'static,
    L: Loader<K>,
    C: Send + Sync + Clone + Eq + Hash + 'static,
{
    pub(crate) fn new(loader: L, cache: Storage<C, L::Value, L::Error>) -> Self {
        Self { loader, state: Mutex::new(State { cache, queue: PendingQueue::new() }) }
    }

    /// Locks the shared state. The lock is never held while user code runs,
    /// so a poisoned lock still guards consistent data.
    pub(crate) fn state(&self) -> MutexGuard<'_, State<K, C, L::Value, L::Error>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs dispatch cycle `cycle` over `entries` and settles every one of
    /// them.
    pub(crate) async fn dispatch(&self, entries: Entries<K, C, L::Value, L::Error>, cycle: u64) {
        if entries.is_empty() {
            return;
        }

        let (keys, mut pending): (Vec<_>, Vec<_>) = entries
            .into_iter()
            .map(|entry| (entry.key, (entry.cached, entry.slot)))
            .unzip();

        tracing::debug!(cycle, keys = keys.len(), "dispatching batch");

        match self.invoke(&keys).await {
            Ok(results) if results.len() == keys.len() => {
                for ((_, slot), result) in pending.iter_mut().zip(results) {
                    slot.settle(result.map_err(Error::Upstream));
                }
            }
            Ok(results) => {
                let error = Error::ShapeMismatch { expected: keys.len(), actual: results.len() };
                self.fail(pending, error);
            }
            Err(error) => self.fail(pending, error),
        }
    }

    async fn invoke(
        &self,
        keys: &[K],
    ) -> Result<Vec<Result<L::Value, L::Error>>, Error<L::Error>> {
        let call = std::panic::catch_unwind(AssertUnwindSafe(|| self.loader.load(keys)))
            .map_err(|panic| Error::BatchFunctionContract(panic_message(panic.as_ref())))?;

        match AssertUnwindSafe(call).catch_unwind().await {
            Ok(result) => result.map_err(Error::Batch),
            Err(panic) => Err(Error::BatchFunctionContract(panic_message(panic.as_ref()))),
        }
    }

    /// Settles every pending slot with `error` after evicting their cache
    /// entries, so the next load of those keys retries.
    fn fail(
        &self,
        pending: Vec<(Cached<C, L::Value, L::Error>, ResultSlot<L::Value, L::Error>)>,
        error: Error<L::Error>,
    ) {
        let evicted = self.evict(pending.iter().filter_map(|(cached, _)| cached.as_ref()));

        tracing::warn!(error = ?error, keys = pending.len(), evicted, "batch load failed");

        for (_, mut slot) in pending {
            slot.settle(Err(error.clone()));
        }
    }

    /// Settles queued entries whose dispatch will never run.
    fn cancel(&self, entries: Entries<K, C, L::Value, L::Error>) {
        let pending = entries
            .into_iter()
            .map(|entry| (entry.cached, entry.slot))
            .collect();
        self.fail(pending, Error::Canceled);
    }

    /// Removes the cache entries that still hold the given futures and returns
    /// how many were removed.
    fn evict<'a, I>(&self, cached: I) -> usize
    where
        I: IntoIterator<Item = &'a (C, LoadFuture<L::Value, L::Error>)>,
    {
        let mut state = self.state();
        let mut evicted = 0;
        for (cache_key, future) in cached {
            // a newer request may already own this key
            let owned = state
                .cache
                .get(cache_key)
                .is_some_and(|current| current.ptr_eq(future));
            if owned {
                state.cache.remove(cache_key);
                evicted += 1;
            }
        }
        evicted
    }
}

/// Travels with a spawned dispatch task and cleans up if the task is dropped
/// before it finishes, e.g. aborted or discarded at runtime shutdown.
///
/// Entries still queued for the task's cycle are settled with
/// [Error::Canceled]. Cache entries created for the task's keys are evicted,
/// so later loads are queued again instead of awaiting a dead cycle.
pub(crate) struct DispatchGuard<K, L, C>
where
    K: Send + Sync + 'static,
    L: Loader<K>,
    C: Send + Sync + Clone + Eq + Hash + 'static,
{
    inner: Arc<DataLoaderInner<K, L, C>>,
    cycle: Option<u64>,
    cached: Vec<(C, LoadFuture<L::Value, L::Error>)>,
    done: bool,
}

impl<K, L, C> DispatchGuard<K, L, C>
where
    K: Send + Sync + 'static,
    L: Loader<K>,
    C: Send + Sync + Clone + Eq + Hash + 'static,
{
    /// Guards a cycle that is still in the queue.
    pub(crate) fn deferred(inner: Arc<DataLoaderInner<K, L, C>>, cycle: u64) -> Self {
        Self { inner, cycle: Some(cycle), cached: Vec::new(), done: false }
    }

    /// Guards entries that were already drained from the queue.
    pub(crate) fn immediate(
        inner: Arc<DataLoaderInner<K, L, C>>,
        entries: &[PendingEntry<K, C, L::Value, L::Error>],
    ) -> Self {
        let cached = entries.iter().filter_map(|entry| entry.cached.clone()).collect();
        Self { inner, cycle: None, cached, done: false }
    }

    /// Drains the guarded cycle, unless the queue moved on since it was
    /// scheduled.
    pub(crate) fn take_cycle(&mut self) -> Option<Entries<K, C, L::Value, L::Error>> {
        let cycle = self.cycle.take()?;
        let entries = self.inner.state().queue.drain_cycle(cycle)?;
        self.cached = entries.iter().filter_map(|entry| entry.cached.clone()).collect();
        Some(entries)
    }

    /// Marks the dispatch as finished. Every entry is settled by now.
    pub(crate) fn complete(mut self) {
        self.done = true;
    }
}

impl<K, L, C> Drop for DispatchGuard<K, L, C>
where
    K: Send + Sync + 'static,
    L: Loader<K>,
    C: Send + Sync + Clone + Eq + Hash + 'static,
{
    fn drop(&mut self) {
        if self.done {
            return;
        }

        if let Some(entries) = self.take_cycle() {
            self.inner.cancel(entries);
        } else if !self.cached.is_empty() {
            // dispatched slots were dropped with the task and resolve as canceled
            let evicted = self.inner.evict(&self.cached);
            tracing::warn!(keys = self.cached.len(), evicted, "dispatch dropped before completion");
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|message| message.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "batch load function panicked".to_string())
}
