use std::hash::Hash;
use std::sync::Arc;

use super::cache::CacheStorage;
use super::data_loader::DataLoader;
use super::loader::Loader;
use super::no_batch::NoBatchLoader;
use crate::batch::Batch;
use crate::error::Result;

/// The capability shared by the batching and the pass-through loader, so the
/// two stay interchangeable behind one seam and callers pick by
/// configuration, not by code path.
#[async_trait::async_trait]
pub trait LoadStrategy<K>: Send + Sync
where
    K: Send + Sync + Hash + Eq + Clone + 'static,
{
    type Value: Send + Sync + Clone + 'static;
    type Error: Send + Sync + Clone + 'static;

    async fn load_one(&self, key: K) -> Result<Self::Value, Self::Error>;

    async fn load_many(&self, keys: Vec<K>) -> Vec<Result<Self::Value, Self::Error>>;
}

#[async_trait::async_trait]
impl<K, L, S> LoadStrategy<K> for DataLoader<K, L, S>
where
    K: Send + Sync + Hash + Eq + Clone + 'static,
    L: Loader<K>,
    S: CacheStorage<Key = K, Value = L::Value>,
{
    type Value = L::Value;
    type Error = L::Error;

    async fn load_one(&self, key: K) -> Result<L::Value, L::Error> {
        DataLoader::load_one(self, key).await
    }

    async fn load_many(&self, keys: Vec<K>) -> Vec<Result<L::Value, L::Error>> {
        DataLoader::load_many(self, keys).await
    }
}

#[async_trait::async_trait]
impl<K, L> LoadStrategy<K> for NoBatchLoader<K, L>
where
    K: Send + Sync + Hash + Eq + Clone + 'static,
    L: Loader<K>,
{
    type Value = L::Value;
    type Error = L::Error;

    async fn load_one(&self, key: K) -> Result<L::Value, L::Error> {
        NoBatchLoader::load_one(self, key).await
    }

    async fn load_many(&self, keys: Vec<K>) -> Vec<Result<L::Value, L::Error>> {
        NoBatchLoader::load_many(self, keys).await
    }
}

/// Builds the loading strategy the given configuration asks for.
pub fn loader_for<K, L>(
    loader: L,
    batch: &Batch,
) -> Arc<dyn LoadStrategy<K, Value = L::Value, Error = L::Error>>
where
    K: Send + Sync + Hash + Eq + Clone + 'static,
    L: Loader<K>,
{
    if batch.is_enabled() {
        Arc::new(
            DataLoader::new(loader)
                .delay(batch.wait())
                .max_batch_size(batch.max_size.unwrap_or_default()),
        )
    } else {
        Arc::new(NoBatchLoader::new(loader))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures_util::future::join_all;

    use super::super::loader::LoadResult;
    use super::*;

    #[derive(Clone, Default)]
    struct CountingLoader {
        load_count: Arc<AtomicUsize>,
    }

    #[async_trait::async_trait]
    impl Loader<u64> for CountingLoader {
        type Value = u64;
        type Error = String;

        async fn load(&self, keys: &[u64]) -> LoadResult<u64, String> {
            self.load_count.fetch_add(1, Ordering::SeqCst);
            LoadResult::values(keys.iter().map(|key| key * 10).collect())
        }
    }

    #[tokio::test]
    async fn test_disabled_batching_selects_pass_through() {
        let loader = CountingLoader::default();
        let strategy = loader_for(loader.clone(), &Batch { delay: 0, max_size: None });

        let _ = strategy.load_one(1).await;
        let _ = strategy.load_one(1).await;

        assert_eq!(
            loader.load_count.load(Ordering::SeqCst),
            2,
            "the pass-through strategy never caches"
        );
    }

    #[tokio::test]
    async fn test_enabled_batching_coalesces() {
        let loader = CountingLoader::default();
        let strategy = loader_for(loader.clone(), &Batch::default().delay(1));

        let results = join_all([strategy.load_one(1), strategy.load_one(2)]).await;

        assert_eq!(loader.load_count.load(Ordering::SeqCst), 1);
        pretty_assertions::assert_eq!(results, vec![Ok(10), Ok(20)]);
    }

    #[tokio::test]
    async fn test_strategies_agree_on_results() {
        let batched = loader_for(CountingLoader::default(), &Batch::default().delay(1));
        let direct = loader_for(CountingLoader::default(), &Batch { delay: 0, max_size: None });

        let keys = vec![1, 2, 3];
        let from_batched = batched.load_many(keys.clone()).await;
        let from_direct = direct.load_many(keys).await;

        pretty_assertions::assert_eq!(from_batched, from_direct);
    }
}
