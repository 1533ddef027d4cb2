pub mod cache;
pub mod traits;

pub use cache::{
    ArticleCache, CacheConfig, CacheEntry, CacheManager, CacheStats, FeedCache, FeedKey, FeedScope, TtlCache,
};
pub use traits::{ArticleSink, MemoryStorage, StorageStats};
