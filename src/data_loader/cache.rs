use std::collections::hash_map::RandomState;
use std::collections::HashMap;
use std::hash::{BuildHasher, Hash};
use std::num::NonZeroUsize;

use super::storage::CacheStorage;

/// [std::collections::HashMap] cache. Unbounded, entries live until they are
/// cleared.
pub struct HashMapCache<K, V, S = RandomState>(HashMap<K, V, S>);

impl<K, V> HashMapCache<K, V, RandomState> {
    pub fn new() -> Self {
        Self(HashMap::new())
    }
}

impl<K, V, S: BuildHasher + Default> HashMapCache<K, V, S> {
    /// Use specified `S: BuildHasher` to create a `HashMap` cache.
    pub fn with_hasher() -> Self {
        Self(HashMap::default())
    }
}

impl<K, V> Default for HashMapCache<K, V, RandomState> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> CacheStorage for HashMapCache<K, V, S>
where
    K: Send + Sync + Clone + Eq + Hash + 'static,
    V: Send + Sync + Clone + 'static,
    S: Send + Sync + BuildHasher + 'static,
{
    type Key = K;
    type Value = V;

    #[inline]
    fn get(&mut self, key: &Self::Key) -> Option<&Self::Value> {
        self.0.get(key)
    }

    #[inline]
    fn contains_key(&self, key: &Self::Key) -> bool {
        self.0.contains_key(key)
    }

    #[inline]
    fn insert(&mut self, key: Self::Key, val: Self::Value) {
        self.0.insert(key, val);
    }

    #[inline]
    fn remove(&mut self, key: &Self::Key) {
        self.0.remove(key);
    }

    #[inline]
    fn clear(&mut self) {
        self.0.clear();
    }

    #[inline]
    fn len(&self) -> usize {
        self.0.len()
    }

    fn iter(&self) -> Box<dyn Iterator<Item = (&'_ Self::Key, &'_ Self::Value)> + '_> {
        Box::new(self.0.iter())
    }
}

/// LRU cache.
pub struct LruCache<K: Hash + Eq, V>(lru::LruCache<K, V>);

impl<K: Hash + Eq, V> LruCache<K, V> {
    /// Creates a new LRU Cache that holds at most `cap` items. A capacity of
    /// zero is bumped to one.
    pub fn new(cap: usize) -> Self {
        Self(lru::LruCache::new(
            NonZeroUsize::new(cap).unwrap_or(NonZeroUsize::MIN),
        ))
    }
}

impl<K, V> CacheStorage for LruCache<K, V>
where
    K: Send + Sync + Clone + Eq + Hash + 'static,
    V: Send + Sync + Clone + 'static,
{
    type Key = K;
    type Value = V;

    #[inline]
    fn get(&mut self, key: &Self::Key) -> Option<&Self::Value> {
        self.0.get(key)
    }

    #[inline]
    fn contains_key(&self, key: &Self::Key) -> bool {
        self.0.contains(key)
    }

    #[inline]
    fn insert(&mut self, key: Self::Key, val: Self::Value) {
        self.0.put(key, val);
    }

    #[inline]
    fn remove(&mut self, key: &Self::Key) {
        self.0.pop(key);
    }

    #[inline]
    fn clear(&mut self) {
        self.0.clear();
    }

    #[inline]
    fn len(&self) -> usize {
        self.0.len()
    }

    fn iter(&self) -> Box<dyn Iterator<Item = (&'_ Self::Key, &'_ Self::Value)> + '_> {
        Box::new(self.0.iter())
    }
}
