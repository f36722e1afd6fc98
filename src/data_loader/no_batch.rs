use std::hash::Hash;
use std::marker::PhantomData;

use super::loader::Loader;
use crate::error::Result;

/// Pass-through loader: no collection window, no cache.
///
/// Every call goes straight to the underlying [`Loader`] with exactly the
/// keys it was given, duplicates included. Used where the latency cost of a
/// batching window is not worth paying; the error-shape rules are the same as
/// for [DataLoader](super::DataLoader).
pub struct NoBatchLoader<K, L> {
    loader: L,
    _mark: PhantomData<fn(K)>,
}

impl<K, L> NoBatchLoader<K, L>
where
    K: Send + Sync + Hash + Eq + Clone + 'static,
    L: Loader<K>,
{
    pub fn new(loader: L) -> Self {
        NoBatchLoader { loader, _mark: PhantomData }
    }

    /// Get the loader.
    #[inline]
    pub fn loader(&self) -> &L {
        &self.loader
    }

    /// Loads one value with a single-key bulk call.
    pub async fn load_one(&self, key: K) -> Result<L::Value, L::Error> {
        let keys = [key];
        let mut results = self.loader.load(&keys).await.into_per_key(1);
        results.remove(0)
    }

    /// Loads many values with one bulk call carrying the keys unreduced.
    pub async fn load_many<I>(&self, keys: I) -> Vec<Result<L::Value, L::Error>>
    where
        I: IntoIterator<Item = K>,
    {
        let keys: Vec<K> = keys.into_iter().collect();
        if keys.is_empty() {
            return Vec::new();
        }
        tracing::debug!(keys = keys.len(), "unbatched load");
        self.loader.load(&keys).await.into_per_key(keys.len())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use super::super::loader::LoadResult;
    use super::*;
    use crate::error::Error;

    #[derive(Clone, Default)]
    struct EchoLoader {
        load_count: Arc<AtomicUsize>,
        batches: Arc<Mutex<Vec<Vec<String>>>>,
        fail: bool,
    }

    #[async_trait::async_trait]
    impl Loader<String> for EchoLoader {
        type Value = String;
        type Error = String;

        async fn load(&self, keys: &[String]) -> LoadResult<String, String> {
            self.load_count.fetch_add(1, Ordering::SeqCst);
            self.batches.lock().unwrap().push(keys.to_vec());
            if self.fail {
                return LoadResult::error("backend down".to_string());
            }
            LoadResult::values(keys.iter().map(|key| format!("value_{}", key)).collect())
        }
    }

    #[tokio::test]
    async fn test_every_call_is_its_own_fetch() {
        let loader = EchoLoader::default();
        let no_batch = NoBatchLoader::new(loader.clone());

        let _ = no_batch.load_one("a".to_string()).await;
        let _ = no_batch.load_one("a".to_string()).await;

        assert_eq!(
            loader.load_count.load(Ordering::SeqCst),
            2,
            "no caching, no coalescing"
        );
    }

    #[tokio::test]
    async fn test_duplicates_are_passed_through() {
        let loader = EchoLoader::default();
        let no_batch = NoBatchLoader::new(loader.clone());

        let results = no_batch
            .load_many(vec!["a".to_string(), "a".to_string(), "b".to_string()])
            .await;

        pretty_assertions::assert_eq!(
            loader.batches.lock().unwrap().clone(),
            vec![vec!["a".to_string(), "a".to_string(), "b".to_string()]]
        );
        pretty_assertions::assert_eq!(
            results,
            vec![
                Ok("value_a".to_string()),
                Ok("value_a".to_string()),
                Ok("value_b".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_input_skips_the_loader() {
        let loader = EchoLoader::default();
        let no_batch = NoBatchLoader::new(loader.clone());

        let results = no_batch.load_many(Vec::new()).await;
        assert!(results.is_empty());
        assert_eq!(loader.load_count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_uniform_error_applies_to_every_key() {
        let loader = EchoLoader { fail: true, ..Default::default() };
        let no_batch = NoBatchLoader::new(loader.clone());

        let results = no_batch
            .load_many(vec!["a".to_string(), "b".to_string()])
            .await;
        pretty_assertions::assert_eq!(
            results,
            vec![Err(Error::Loader("backend down".to_string())); 2]
        );
    }
}
