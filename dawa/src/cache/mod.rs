//! Response cache storage.

mod memory;
mod traits;

pub use memory::MemoryCache;
pub use traits::CacheStorage;
