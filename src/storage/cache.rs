use std::borrow::Borrow;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;

use crate::feed::{Article, Feed};

/// Cache entry with insertion tracking
#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub data: Arc<T>,
    pub inserted_at: Instant,
}

impl<T> CacheEntry<T> {
    pub fn new(data: Arc<T>) -> Self {
        Self {
            data,
            inserted_at: Instant::now(),
        }
    }

    pub fn is_expired(&self, ttl: Duration) -> bool {
        self.inserted_at.elapsed() > ttl
    }
}

/// Cache statistics for monitoring
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub expirations: u64,
    pub total_entries: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    pub fn record_expiration(&mut self) {
        self.expirations += 1;
    }
}

/// Configuration for both caches. The TTL is shared.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub ttl: Duration,
    pub feed_capacity: usize,
    pub article_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(1800), // 30 minutes
            feed_capacity: 100,
            article_capacity: 1000,
        }
    }
}

struct Inner<K: Hash + Eq, V> {
    entries: LruCache<K, CacheEntry<V>>,
    stats: CacheStats,
}

/// Bounded, time-expiring key-value store.
///
/// Values are handed out as `Arc`s and replaced wholesale on insert. An
/// entry older than the TTL is reported as absent on read, whether or not it
/// has been evicted yet. Once capacity is reached the least recently used
/// entry is dropped.
pub struct TtlCache<K: Hash + Eq, V> {
    inner: Arc<Mutex<Inner<K, V>>>,
    ttl: Duration,
}

impl<K: Hash + Eq, V> Clone for TtlCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            ttl: self.ttl,
        }
    }
}

impl<K, V> TtlCache<K, V>
where
    K: Hash + Eq + Clone,
{
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);

        Self {
            inner: Arc::new(Mutex::new(Inner {
                entries: LruCache::new(capacity),
                stats: CacheStats::default(),
            })),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Get a live value, dropping it if it has expired.
    pub fn get<Q>(&self, key: &Q) -> Option<Arc<V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        let ttl = self.ttl;

        let expired = match inner.entries.get_mut(key) {
            Some(entry) if !entry.is_expired(ttl) => {
                let value = Arc::clone(&entry.data);
                inner.stats.record_hit();
                return Some(value);
            }
            Some(_) => true,
            None => false,
        };

        if expired {
            inner.entries.pop(key);
            inner.stats.record_expiration();
            inner.stats.total_entries = inner.entries.len();
        }
        inner.stats.record_miss();
        None
    }

    /// Insert or replace a value.
    pub fn insert(&self, key: K, value: V) -> Arc<V> {
        let value = Arc::new(value);
        let mut inner = self.inner.lock();

        if let Some((old_key, _)) = inner.entries.push(key.clone(), CacheEntry::new(Arc::clone(&value))) {
            if old_key != key {
                inner.stats.record_eviction();
            }
        }

        inner.stats.total_entries = inner.entries.len();
        value
    }

    /// True if a live entry exists. Does not touch recency or stats.
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let inner = self.inner.lock();
        inner
            .entries
            .peek(key)
            .map(|entry| !entry.is_expired(self.ttl))
            .unwrap_or(false)
    }

    /// Drop every expired entry, returning how many were removed.
    pub fn cleanup_expired(&self) -> usize {
        let mut inner = self.inner.lock();
        let expired_keys: Vec<K> = inner
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(self.ttl))
            .map(|(key, _)| key.clone())
            .collect();

        for key in &expired_keys {
            inner.entries.pop(key);
            inner.stats.record_expiration();
        }

        inner.stats.total_entries = inner.entries.len();
        expired_keys.len()
    }

    pub fn stats(&self) -> CacheStats {
        self.inner.lock().stats.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }
}

/// What a cached feed was built from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FeedScope {
    Category(String),
    Source(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FeedKey {
    pub scope: FeedScope,
    pub page: usize,
    pub limit: usize,
}

impl FeedKey {
    pub fn category(category: &str, page: usize, limit: usize) -> Self {
        Self {
            scope: FeedScope::Category(category.to_string()),
            page,
            limit,
        }
    }

    pub fn source(source_id: &str, limit: usize) -> Self {
        Self {
            scope: FeedScope::Source(source_id.to_string()),
            page: 1,
            limit,
        }
    }
}

/// Assembled feeds keyed by (category, page, limit).
pub type FeedCache = TtlCache<FeedKey, Feed>;

/// Individual articles keyed by article id.
pub type ArticleCache = TtlCache<String, Article>;

/// The two caches owned by an aggregator
#[derive(Clone)]
pub struct CacheManager {
    pub feeds: FeedCache,
    pub articles: ArticleCache,
}

impl CacheManager {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            feeds: FeedCache::new(config.feed_capacity, config.ttl),
            articles: ArticleCache::new(config.article_capacity, config.ttl),
        }
    }

    /// Cleanup expired entries in both caches
    pub fn cleanup_expired(&self) -> (usize, usize) {
        (self.feeds.cleanup_expired(), self.articles.cleanup_expired())
    }

    pub fn combined_stats(&self) -> (CacheStats, CacheStats) {
        (self.feeds.stats(), self.articles.stats())
    }
}

impl Default for CacheManager {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_operations() {
        let cache: TtlCache<String, u32> = TtlCache::new(10, Duration::from_secs(60));

        cache.insert("a".to_string(), 1);
        assert_eq!(cache.get("a").as_deref(), Some(&1));
        assert!(cache.get("missing").is_none());

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.total_entries, 1);
    }

    #[test]
    fn test_insert_replaces_wholesale() {
        let cache: TtlCache<String, Vec<u32>> = TtlCache::new(10, Duration::from_secs(60));

        let first = cache.insert("k".to_string(), vec![1, 2]);
        cache.insert("k".to_string(), vec![3]);

        assert_eq!(*first, vec![1, 2]);
        assert_eq!(*cache.get("k").unwrap(), vec![3]);
        assert_eq!(cache.stats().evictions, 0);
    }

    #[test]
    fn test_capacity_eviction() {
        let cache: TtlCache<String, u32> = TtlCache::new(2, Duration::from_secs(60));

        cache.insert("article1".to_string(), 1);
        cache.insert("article2".to_string(), 2);
        cache.insert("article3".to_string(), 3);

        assert_eq!(cache.len(), 2);
        assert!(cache.get("article1").is_none());
        assert!(cache.get("article3").is_some());
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_expired_entry_is_absent() {
        let cache: TtlCache<String, u32> = TtlCache::new(10, Duration::from_millis(10));

        cache.insert("test".to_string(), 7);
        assert!(cache.contains("test"));
        assert!(cache.get("test").is_some());

        std::thread::sleep(Duration::from_millis(20));

        assert!(!cache.contains("test"));
        assert!(cache.get("test").is_none());

        let stats = cache.stats();
        assert_eq!(stats.expirations, 1);
        assert_eq!(stats.total_entries, 0);
    }

    #[test]
    fn test_cleanup_expired() {
        let cache: TtlCache<String, u32> = TtlCache::new(10, Duration::from_millis(30));

        cache.insert("old1".to_string(), 1);
        cache.insert("old2".to_string(), 2);
        std::thread::sleep(Duration::from_millis(40));
        cache.insert("fresh".to_string(), 3);

        assert_eq!(cache.cleanup_expired(), 2);
        assert_eq!(cache.len(), 1);
        assert!(cache.get("fresh").is_some());
    }

    #[test]
    fn test_zero_capacity_still_holds_one() {
        let cache: TtlCache<String, u32> = TtlCache::new(0, Duration::from_secs(60));
        cache.insert("only".to_string(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_feed_keys_are_distinct() {
        let cache = FeedCache::new(10, Duration::from_secs(60));
        cache.insert(FeedKey::category("technology", 1, 5), Feed::empty("technology", 1, 5));

        assert!(cache.contains(&FeedKey::category("technology", 1, 5)));
        assert!(!cache.contains(&FeedKey::category("technology", 2, 5)));
        assert!(!cache.contains(&FeedKey::category("technology", 1, 10)));
        assert!(!cache.contains(&FeedKey::source("technology", 5)));
    }

    #[test]
    fn test_cache_manager_shares_ttl() {
        let manager = CacheManager::new(CacheConfig {
            ttl: Duration::from_secs(5),
            ..Default::default()
        });

        assert_eq!(manager.feeds.ttl(), Duration::from_secs(5));
        assert_eq!(manager.articles.ttl(), Duration::from_secs(5));
        assert_eq!(manager.cleanup_expired(), (0, 0));
    }

    #[test]
    fn test_cache_stats_hit_rate() {
        let mut stats = CacheStats::default();
        assert_eq!(stats.hit_rate(), 0.0);

        stats.record_hit();
        stats.record_hit();
        stats.record_miss();

        assert!((stats.hit_rate() - 2.0 / 3.0).abs() < f64::EPSILON);
    }
}
