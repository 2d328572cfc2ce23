mod cache;
mod config;
mod dataloader;
mod dispatch;
mod error;
mod loader;
mod queue;
mod scheduler;
mod slot;
mod storage;

pub use cache::{HashMapCache, LruCache};
pub use config::LoaderConfig;
pub use dataloader::DataLoader;
pub use error::{Error, Result};
pub use loader::{BatchResult, LoadFn, Loader};
pub use scheduler::{ManualScheduler, Spawner};
pub use slot::LoadFuture;
pub use storage::CacheStorage;
