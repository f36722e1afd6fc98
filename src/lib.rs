//! Coalescing, caching key-lookup loader.
//!
//! API servers resolve one entity at a time while answering a single request,
//! which turns into an N+1 query pattern against the backing store. The
//! [`DataLoader`] collects those single-key lookups for a short window,
//! issues one bulk [`Loader::load`] call per window, caches the successes and
//! hands every caller its own positional result. [`NoBatchLoader`] satisfies
//! the same [`LoadStrategy`] contract with no window at all, for
//! configurations where the added latency is not worth it.
//!
//! Loaders are built per entity type by supplying a [`Loader`]
//! implementation, and are meant to be scoped to a single request so the
//! cache can never serve stale data across requests.

mod batch;
mod data_loader;
mod error;

pub use batch::{Batch, DEFAULT_MAX_SIZE};
pub use data_loader::{
    loader_for, CacheStorage, DataLoader, HashMapCache, LoadResult, LoadStrategy, Loader, LruCache,
    NoBatchLoader, NoCache, Thunk,
};
pub use error::{Error, Result};
