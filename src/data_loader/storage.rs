use std::hash::Hash;

/// Cache storage for [DataLoader](super::DataLoader).
///
/// The loader stores one shared future per cache key, so a value that is
/// still being fetched and a value that has already arrived live in the same
/// map.
pub trait CacheStorage: Send + Sync + 'static {
    /// The key type of the record.
    type Key: Send + Sync + Clone + Eq + Hash + 'static;

    /// The value type of the record.
    type Value: Send + Sync + Clone + 'static;

    /// Returns a reference to the value of the key in the cache or None if it
    /// is not present in the cache.
    fn get(&mut self, key: &Self::Key) -> Option<&Self::Value>;

    /// Returns `true` if the key is present, without touching any recency
    /// bookkeeping.
    fn contains_key(&self, key: &Self::Key) -> bool;

    /// Puts a key-value pair into the cache. If the key already exists in the
    /// cache, then it updates the key's value.
    fn insert(&mut self, key: Self::Key, val: Self::Value);

    /// Removes the value corresponding to the key from the cache. Removing an
    /// absent key is a no-op.
    fn remove(&mut self, key: &Self::Key);

    /// Clears the cache, removing all key-value pairs.
    fn clear(&mut self);

    /// Number of records in the cache.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns an iterator over the key-value pairs in the cache.
    fn iter(&self) -> Box<dyn Iterator<Item = (&'_ Self::Key, &'_ Self::Value)> + '_>;
}
