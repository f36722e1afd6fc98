use std::borrow::Cow;
use std::collections::hash_map::RandomState;
use std::collections::HashMap;
use std::hash::{BuildHasher, Hash};
use std::marker::PhantomData;
use std::num::NonZeroUsize;

/// Cache storage for a [DataLoader](super::DataLoader).
///
/// One storage belongs to exactly one loader and is accessed under the
/// loader's lock, hence the `&mut` receivers.
pub trait CacheStorage: Send + Sync + 'static {
    /// The key type of the record.
    type Key: Send + Sync + Clone + Eq + Hash + 'static;

    /// The value type of the record.
    type Value: Send + Sync + Clone + 'static;

    /// Returns a reference to the value of the key in the cache or None if it
    /// is not present in the cache.
    fn get(&mut self, key: &Self::Key) -> Option<&Self::Value>;

    /// Puts a key-value pair into the cache. If the key already exists in the
    /// cache, then it updates the key's value.
    fn insert(&mut self, key: Cow<'_, Self::Key>, val: Cow<'_, Self::Value>);

    /// Removes the value corresponding to the key from the cache.
    fn remove(&mut self, key: &Self::Key);

    /// Clears the cache, removing all key-value pairs.
    fn clear(&mut self);

    /// Returns an iterator over the key-value pairs in the cache.
    fn iter(&self) -> Box<dyn Iterator<Item = (&'_ Self::Key, &'_ Self::Value)> + '_>;
}

/// No cache. Keys issued within one collection window are still coalesced;
/// nothing survives past the window.
pub struct NoCache<K, V> {
    _mark1: PhantomData<K>,
    _mark2: PhantomData<V>,
}

impl<K, V> Default for NoCache<K, V> {
    fn default() -> Self {
        NoCache { _mark1: PhantomData, _mark2: PhantomData }
    }
}

impl<K, V> CacheStorage for NoCache<K, V>
where
    K: Send + Sync + Clone + Eq + Hash + 'static,
    V: Send + Sync + Clone + 'static,
{
    type Key = K;
    type Value = V;

    #[inline]
    fn get(&mut self, _key: &K) -> Option<&V> {
        None
    }

    #[inline]
    fn insert(&mut self, _key: Cow<'_, K>, _val: Cow<'_, V>) {}

    #[inline]
    fn remove(&mut self, _key: &K) {}

    #[inline]
    fn clear(&mut self) {}

    fn iter(&self) -> Box<dyn Iterator<Item = (&'_ K, &'_ V)> + '_> {
        Box::new(std::iter::empty())
    }
}

/// Unbounded [std::collections::HashMap] cache. Entries never expire; this is
/// the right default for loaders scoped to a single request.
pub struct HashMapCache<K, V, S = RandomState>(HashMap<K, V, S>);

impl<K, V, S: BuildHasher + Default> Default for HashMapCache<K, V, S> {
    fn default() -> Self {
        HashMapCache(HashMap::default())
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
    fn get(&mut self, key: &K) -> Option<&V> {
        self.0.get(key)
    }

    #[inline]
    fn insert(&mut self, key: Cow<'_, K>, val: Cow<'_, V>) {
        self.0.insert(key.into_owned(), val.into_owned());
    }

    #[inline]
    fn remove(&mut self, key: &K) {
        self.0.remove(key);
    }

    #[inline]
    fn clear(&mut self) {
        self.0.clear();
    }

    fn iter(&self) -> Box<dyn Iterator<Item = (&'_ K, &'_ V)> + '_> {
        Box::new(self.0.iter())
    }
}

/// LRU cache holding at most `cap` entries.
pub struct LruCache<K: Hash + Eq, V>(lru::LruCache<K, V>);

impl<K: Hash + Eq, V> LruCache<K, V> {
    /// Creates a new LRU cache that holds at most `cap` items.
    ///
    /// # Panics
    ///
    /// Panics if `cap` is zero.
    pub fn new(cap: usize) -> Self {
        LruCache(lru::LruCache::new(
            NonZeroUsize::new(cap).expect("capacity must be non-zero"),
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
    fn get(&mut self, key: &K) -> Option<&V> {
        self.0.get(key)
    }

    #[inline]
    fn insert(&mut self, key: Cow<'_, K>, val: Cow<'_, V>) {
        self.0.put(key.into_owned(), val.into_owned());
    }

    #[inline]
    fn remove(&mut self, key: &K) {
        self.0.pop(key);
    }

    #[inline]
    fn clear(&mut self) {
        self.0.clear();
    }

    fn iter(&self) -> Box<dyn Iterator<Item = (&'_ K, &'_ V)> + '_> {
        Box::new(self.0.iter())
    }
}
