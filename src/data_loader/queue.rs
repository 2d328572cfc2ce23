use super::slot::{LoadFuture, ResultSlot};

/// A request waiting for the next dispatch cycle.
pub(crate) struct PendingEntry<K, C, V, E> {
    pub(crate) key: K,
    /// Cache key and the future stored under it, when the request was cached.
    pub(crate) cached: Option<(C, LoadFuture<V, E>)>,
    pub(crate) slot: ResultSlot<V, E>,
}

/// Keys accumulated between two dispatch cycles, in request order.
pub(crate) struct PendingQueue<K, C, V, E> {
    entries: Vec<PendingEntry<K, C, V, E>>,
    cycle: u64,
}

impl<K, C, V, E> PendingQueue<K, C, V, E>
where
    V: Send + Sync + Clone + 'static,
    E: Send + Sync + Clone + 'static,
{
    pub(crate) fn new() -> Self {
        Self { entries: Vec::new(), cycle: 0 }
    }

    /// Appends a request and returns the future that its dispatch will settle.
    pub(crate) fn enqueue(&mut self, key: K, cache_key: Option<C>) -> LoadFuture<V, E> {
        let (slot, future) = ResultSlot::new();
        let cached = cache_key.map(|cache_key| (cache_key, future.clone()));
        self.entries.push(PendingEntry { key, cached, slot });
        future
    }

    /// Takes every queued entry and opens the next cycle.
    pub(crate) fn drain(&mut self) -> Vec<PendingEntry<K, C, V, E>> {
        self.cycle = self.cycle.wrapping_add(1);
        std::mem::take(&mut self.entries)
    }

    /// Drains only if nothing has drained the queue since `cycle` was observed.
    pub(crate) fn drain_cycle(&mut self, cycle: u64) -> Option<Vec<PendingEntry<K, C, V, E>>> {
        (self.cycle == cycle).then(|| self.drain())
    }

    pub(crate) fn cycle(&self) -> u64 {
        self.cycle
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    type Queue = PendingQueue<u32, u32, String, String>;

    #[test]
    fn test_drain_preserves_order() {
        let mut queue = Queue::new();
        queue.enqueue(3, None);
        queue.enqueue(1, Some(1));
        queue.enqueue(2, None);

        let keys: Vec<_> = queue.drain().into_iter().map(|entry| entry.key).collect();
        assert_eq!(keys, vec![3, 1, 2]);
        assert_eq!(queue.len(), 0);
    }

    #[test]
    fn test_drain_opens_new_cycle() {
        let mut queue = Queue::new();
        queue.enqueue(1, None);
        let first = queue.cycle();
        queue.drain();

        queue.enqueue(2, None);
        assert!(queue.drain_cycle(first).is_none());
        assert_eq!(queue.len(), 1);

        let current = queue.cycle();
        let drained = queue.drain_cycle(current).unwrap_or_default();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].key, 2);
    }

    #[test]
    fn test_cached_entry_shares_future() {
        let mut queue = Queue::new();
        let future = queue.enqueue(1, Some(10));
        let entries = queue.drain();

        let (cache_key, cached) = entries[0].cached.as_ref().unwrap();
        assert_eq!(*cache_key, 10);
        assert!(cached.ptr_eq(&future));
    }
}
