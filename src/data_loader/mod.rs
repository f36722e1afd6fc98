mod cache;
mod data_loader;
mod loader;
mod no_batch;
mod strategy;
mod thunk;

pub use cache::{CacheStorage, HashMapCache, LruCache, NoCache};
pub use data_loader::DataLoader;
pub use loader::{LoadResult, Loader};
pub use no_batch::NoBatchLoader;
pub use strategy::{loader_for, LoadStrategy};
pub use thunk::Thunk;
