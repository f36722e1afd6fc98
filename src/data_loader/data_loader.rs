use std::borrow::Cow;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::future::{join_all, JoinAll};
use tokio::sync::oneshot;

use super::cache::{CacheStorage, HashMapCache};
use super::loader::Loader;
use super::thunk::Thunk;
use crate::error::Result;

/// Batching, caching data loader.
///
/// Reference: <https://github.com/facebook/dataloader>
///
/// Single-key lookups issued concurrently while a batch is open are coalesced
/// into one [`Loader::load`] call. Each distinct key is fetched at most once
/// per window; successful results populate the cache and short-circuit every
/// later lookup for the lifetime of the loader instance.
///
/// Timer and fetch tasks are spawned on the ambient Tokio runtime, so the
/// loader must be used from within one.
pub struct DataLoader<K, L, S = HashMapCache<K, <L as Loader<K>>::Value>>
where
    K: Send + Sync + Hash + Eq + Clone + 'static,
    L: Loader<K>,
    S: CacheStorage<Key = K, Value = L::Value>,
{
    inner: Arc<DataLoaderInner<K, L, S>>,
    delay: Duration,
    max_batch_size: usize,
}

struct DataLoaderInner<K, L, S>
where
    K: Send + Sync + Hash + Eq + Clone + 'static,
    L: Loader<K>,
    S: CacheStorage<Key = K, Value = L::Value>,
{
    loader: L,
    state: Mutex<State<K, L, S>>,
}

/// Everything guarded by the loader's single lock: the cache and the batch
/// currently collecting keys.
struct State<K, L, S>
where
    K: Send + Sync + Hash + Eq + Clone + 'static,
    L: Loader<K>,
{
    cache: S,
    batch: Option<PendingBatch<K, L>>,
    next_batch_id: u64,
}

/// One collection window. Lives inside the loader state while open; whichever
/// trigger takes it out of there owns the fetch.
struct PendingBatch<K, L>
where
    K: Send + Sync + Hash + Eq + Clone + 'static,
    L: Loader<K>,
{
    id: u64,
    keys: Vec<K>,
    index: HashMap<K, usize>,
    waiters: Vec<(usize, oneshot::Sender<Result<L::Value, L::Error>>)>,
}

impl<K, L> PendingBatch<K, L>
where
    K: Send + Sync + Hash + Eq + Clone + 'static,
    L: Loader<K>,
{
    fn new(id: u64) -> Self {
        PendingBatch { id, keys: Vec::new(), index: HashMap::new(), waiters: Vec::new() }
    }

    /// Position of `key` in this batch, appending it on first sight.
    /// Duplicate requests within one window share a slot.
    fn position(&mut self, key: K) -> usize {
        match self.index.get(&key) {
            Some(&position) => position,
            None => {
                let position = self.keys.len();
                self.index.insert(key.clone(), position);
                self.keys.push(key);
                position
            }
        }
    }
}

impl<K, L> DataLoader<K, L>
where
    K: Send + Sync + Hash + Eq + Clone + 'static,
    L: Loader<K>,
{
    /// Creates a loader backed by an unbounded [`HashMapCache`].
    pub fn new(loader: L) -> Self {
        Self::with_cache(loader, HashMapCache::default())
    }
}

impl<K, L, S> DataLoader<K, L, S>
where
    K: Send + Sync + Hash + Eq + Clone + 'static,
    L: Loader<K>,
    S: CacheStorage<Key = K, Value = L::Value>,
{
    /// Creates a loader with the given cache storage.
    pub fn with_cache(loader: L, cache: S) -> Self {
        DataLoader {
            inner: Arc::new(DataLoaderInner {
                loader,
                state: Mutex::new(State { cache, batch: None, next_batch_id: 0 }),
            }),
            delay: Duration::from_millis(1),
            max_batch_size: 1000,
        }
    }

    /// Specify the delay time for loading data, the default is `1ms`.
    #[must_use]
    pub fn delay(self, delay: Duration) -> Self {
        Self { delay, ..self }
    }

    /// Specify the max batch size for loading data, the default is `1000`.
    ///
    /// If the distinct keys waiting to be loaded reach the threshold, they are
    /// loaded immediately without waiting out the delay. `0` means unbounded:
    /// only the delay timer closes a batch.
    #[must_use]
    pub fn max_batch_size(self, max_batch_size: usize) -> Self {
        Self { max_batch_size, ..self }
    }

    /// Get the loader.
    #[inline]
    pub fn loader(&self) -> &L {
        &self.inner.loader
    }

    /// Use this `DataLoader` to load one value.
    pub async fn load_one(&self, key: K) -> Result<L::Value, L::Error> {
        self.defer_one(key).await
    }

    /// Registers interest in `key` and returns a deferred handle to its
    /// result. Registration happens before this call returns; awaiting the
    /// [`Thunk`] blocks until the owning batch completes. A cached key
    /// resolves on the first poll without touching the loader.
    pub fn defer_one(&self, key: K) -> Thunk<L::Value, L::Error> {
        enum Action<B> {
            StartTimer(u64),
            Dispatch(B),
            Wait,
        }

        let (thunk, action) = {
            let mut state = self.inner.state.lock().unwrap();

            if let Some(value) = state.cache.get(&key) {
                return Thunk::ready(Ok(value.clone()));
            }

            let mut action = Action::Wait;
            if state.batch.is_none() {
                let id = state.next_batch_id;
                state.next_batch_id = state.next_batch_id.wrapping_add(1);
                state.batch = Some(PendingBatch::new(id));
                action = Action::StartTimer(id);
            }

            let (tx, rx) = oneshot::channel();
            let full = {
                let batch = state.batch.as_mut().expect("an open batch exists at this point");
                let position = batch.position(key);
                batch.waiters.push((position, tx));
                self.max_batch_size > 0 && batch.keys.len() >= self.max_batch_size
            };

            // Reaching the size limit closes the batch on the insertion path;
            // the pending timer for it becomes a no-op.
            if full {
                if let Some(batch) = state.batch.take() {
                    action = Action::Dispatch(batch);
                }
            }

            (Thunk::pending(rx), action)
        };

        match action {
            Action::StartTimer(id) => {
                let inner = self.inner.clone();
                let delay = self.delay;
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    if let Some(batch) = inner.take_batch(id) {
                        inner.do_load(batch).await;
                    }
                });
            }
            Action::Dispatch(batch) => {
                let inner = self.inner.clone();
                tokio::spawn(async move {
                    inner.do_load(batch).await;
                });
            }
            Action::Wait => {}
        }

        thunk
    }

    /// Use this `DataLoader` to load many values. Output order matches the
    /// input order, duplicates included.
    pub async fn load_many<I>(&self, keys: I) -> Vec<Result<L::Value, L::Error>>
    where
        I: IntoIterator<Item = K>,
    {
        self.defer_many(keys).await
    }

    /// Deferred form of [`load_many`](Self::load_many): every key is
    /// registered before this call returns, awaiting resolves them all.
    /// Useful to fan out across independent loaders before blocking on any.
    pub fn defer_many<I>(&self, keys: I) -> JoinAll<Thunk<L::Value, L::Error>>
    where
        I: IntoIterator<Item = K>,
    {
        join_all(keys.into_iter().map(|key| self.defer_one(key)))
    }

    /// Feed a value into the cache without touching the loader. Only inserts
    /// when the key is absent; returns whether it did.
    ///
    /// **NOTE: with [`NoCache`](super::NoCache) storage this has no lasting
    /// effect.**
    pub fn prime(&self, key: K, value: L::Value) -> bool {
        let mut state = self.inner.state.lock().unwrap();
        if state.cache.get(&key).is_some() {
            return false;
        }
        state.cache.insert(Cow::Owned(key), Cow::Owned(value));
        true
    }

    /// Evicts one key from the cache. The next load for it goes back to the
    /// loader.
    pub fn clear(&self, key: &K) {
        let mut state = self.inner.state.lock().unwrap();
        state.cache.remove(key);
    }

    /// Clears the whole cache.
    pub fn clear_all(&self) {
        let mut state = self.inner.state.lock().unwrap();
        state.cache.clear();
    }

    /// Gets all values currently in the cache.
    pub fn get_cached_values(&self) -> HashMap<K, L::Value> {
        let state = self.inner.state.lock().unwrap();
        state
            .cache
            .iter()
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }
}

impl<K, L, S> DataLoaderInner<K, L, S>
where
    K: Send + Sync + Hash + Eq + Clone + 'static,
    L: Loader<K>,
    S: CacheStorage<Key = K, Value = L::Value>,
{
    /// Detaches the current batch if it is still the one the caller saw.
    /// Taking it clears the "current" slot, so later lookups open a fresh
    /// batch instead of racing to join this one.
    fn take_batch(&self, id: u64) -> Option<PendingBatch<K, L>> {
        let mut state = self.state.lock().unwrap();
        if state.batch.as_ref().map(|batch| batch.id) == Some(id) {
            state.batch.take()
        } else {
            None
        }
    }

    /// Runs the bulk fetch for a detached batch and distributes the results.
    /// Executes outside the lock; a slow fetch never blocks other keys.
    async fn do_load(&self, batch: PendingBatch<K, L>) {
        let PendingBatch { keys, waiters, .. } = batch;
        tracing::debug!(keys = keys.len(), waiters = waiters.len(), "dispatching batch load");

        let results = self.loader.load(&keys).await.into_per_key(keys.len());

        // Only successes are cached; a failed key stays loadable and is
        // retried by any later request.
        {
            let mut state = self.state.lock().unwrap();
            for (key, result) in keys.iter().zip(results.iter()) {
                if let Ok(value) = result {
                    state.cache.insert(Cow::Borrowed(key), Cow::Borrowed(value));
                }
            }
        }

        for (position, tx) in waiters {
            let _ = tx.send(results[position].clone());
        }
    }
}
