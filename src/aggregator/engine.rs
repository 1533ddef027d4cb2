use std::sync::Arc;

use chrono::Utc;
use futures::future::join_all;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::feed::fetcher::HttpClient;
use crate::feed::{Article, CategorySummary, Feed};
use crate::sources::{is_all_category, NewsSource, SourceRegistry};
use crate::storage::{ArticleSink, CacheConfig, CacheManager, FeedKey};

/// Largest page size accepted from callers.
pub const MAX_PAGE_LIMIT: usize = 100;

/// Articles pulled from a source when an id is not cached.
pub const DEFAULT_LOOKUP_LIMIT: usize = 50;

/// Reject pagination the engine should never see.
pub fn validate_pagination(page: usize, limit: usize) -> Result<()> {
    if page == 0 {
        return Err(Error::Invalid("Page must be at least 1".to_string()));
    }
    if limit == 0 || limit > MAX_PAGE_LIMIT {
        return Err(Error::Invalid(format!("Limit must be between 1 and {}", MAX_PAGE_LIMIT)));
    }
    Ok(())
}

/// Concatenate per-source batches in order and sort newest first.
///
/// The sort is stable, so articles with equal timestamps keep the order of
/// the batches they came from.
pub fn merge_articles(batches: Vec<Vec<Article>>) -> Vec<Article> {
    let mut merged: Vec<Article> = batches.into_iter().flatten().collect();
    merged.sort_by(|a, b| b.published_at.cmp(&a.published_at));
    merged
}

/// Offset of the first article on `page`.
pub fn page_start(page: usize, limit: usize) -> Result<usize> {
    if page == 0 {
        return Err(Error::Invalid("Page numbers start at 1".to_string()));
    }

    (page - 1)
        .checked_mul(limit)
        .ok_or_else(|| Error::Invalid(format!("Page {} with limit {} overflows", page, limit)))
}

/// The `[(page-1)*limit, page*limit)` window of `articles`.
pub fn page_window(articles: &[Article], page: usize, limit: usize) -> Result<Vec<Article>> {
    let start = page_start(page, limit)?;

    if start >= articles.len() {
        return Ok(Vec::new());
    }

    let end = start.saturating_add(limit).min(articles.len());
    Ok(articles[start..end].to_vec())
}

/// Merge, sort and slice in one step. Returns the page and the merged total.
pub fn merge_and_paginate(batches: Vec<Vec<Article>>, page: usize, limit: usize) -> Result<(Vec<Article>, usize)> {
    let merged = merge_articles(batches);
    let window = page_window(&merged, page, limit)?;
    Ok((window, merged.len()))
}

#[cfg(feature = "metrics")]
fn count(name: &'static str) {
    metrics::increment_counter!(name);
}

#[cfg(not(feature = "metrics"))]
fn count(_name: &'static str) {}

/// Fans requests out to the registered sources, merges what comes back and
/// keeps the feed and article caches.
///
/// Cloning is cheap and every clone shares the same caches.
#[derive(Clone)]
pub struct NewsAggregator {
    pub(crate) registry: SourceRegistry,
    pub(crate) caches: CacheManager,
    categories: Vec<String>,
    sink: Option<Arc<dyn ArticleSink>>,
    pub(crate) lookup_limit: usize,
}

impl NewsAggregator {
    pub fn new(registry: SourceRegistry, cache_config: CacheConfig) -> Self {
        let mut categories: Vec<String> = Vec::new();
        for source in registry.all() {
            if !categories.iter().any(|c| c == source.category()) {
                categories.push(source.category().to_string());
            }
        }

        Self {
            registry,
            caches: CacheManager::new(cache_config),
            categories,
            sink: None,
            lookup_limit: DEFAULT_LOOKUP_LIMIT,
        }
    }

    /// Build the HTTP client, the source registry and the caches from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        let settings = &config.settings;
        let client = HttpClient::new(settings.timeout_duration(), settings.user_agent.clone())?;
        let registry = SourceRegistry::from_config(config, client)?;

        Ok(Self::new(registry, settings.cache_config())
            .with_categories(settings.categories.clone())
            .with_lookup_limit(settings.lookup_limit))
    }

    pub fn with_categories(mut self, categories: Vec<String>) -> Self {
        self.categories = categories;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn ArticleSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn with_lookup_limit(mut self, lookup_limit: usize) -> Self {
        self.lookup_limit = lookup_limit.max(1);
        self
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    pub fn caches(&self) -> &CacheManager {
        &self.caches
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// One page of the merged feed for `category`.
    ///
    /// Served from the feed cache unless `force_refresh` is set. Never fails:
    /// an invalid page or an unmatched category yields an empty feed without
    /// contacting any source, and an aggregation error yields an empty feed.
    pub async fn get_feed(&self, category: &str, page: usize, limit: usize, force_refresh: bool) -> Arc<Feed> {
        if let Err(e) = page_start(page, limit) {
            warn!("Rejected feed request for category '{}': {}", category, e);
            return Arc::new(Feed::empty(category, page, limit));
        }

        let key = FeedKey::category(category, page, limit);

        if !force_refresh {
            if let Some(feed) = self.caches.feeds.get(&key) {
                debug!("Feed cache hit for {}/{}/{}", category, page, limit);
                count("news_station_feed_cache_hits");
                return feed;
            }
            count("news_station_feed_cache_misses");
        }

        let adapters = self.registry.adapters_for_category(category);
        if adapters.is_empty() {
            warn!("No news sources for category '{}'", category);
            return Arc::new(Feed::empty(category, page, limit));
        }

        let (stale_feeds, stale_articles) = self.caches.cleanup_expired();
        if stale_feeds + stale_articles > 0 {
            debug!("Dropped {} expired feeds and {} expired articles", stale_feeds, stale_articles);
        }

        let batches = fan_out(adapters, limit).await;
        let merged = merge_articles(batches);
        let total = merged.len();

        let articles = match page_window(&merged, page, limit) {
            Ok(articles) => articles,
            Err(e) => {
                error!("Error aggregating feed for category '{}': {}", category, e);
                return Arc::new(Feed::empty(category, page, limit));
            }
        };

        for article in &articles {
            self.caches.articles.insert(article.id.clone(), article.clone());
        }

        let feed = Feed {
            articles,
            category: category.to_string(),
            page,
            limit,
            total,
            last_updated: Utc::now(),
        };
        info!(
            "Aggregated {} of {} articles for category '{}' (page {})",
            feed.articles.len(),
            total,
            category,
            page
        );

        self.hand_to_sink(merged);
        let feed = self.caches.feeds.insert(key, feed);

        let (feeds, articles) = self.caches.combined_stats();
        debug!(
            "Cache hit rates: feeds {:.2} ({} entries), articles {:.2} ({} entries)",
            feeds.hit_rate(),
            feeds.total_entries,
            articles.hit_rate(),
            articles.total_entries
        );
        feed
    }

    /// Total article count and freshness for every configured category.
    pub async fn get_category_summary(&self) -> Vec<CategorySummary> {
        let feeds = join_all(
            self.categories
                .iter()
                .map(|category| self.get_feed(category, 1, 1, false)),
        )
        .await;

        self.categories
            .iter()
            .zip(feeds)
            .map(|(name, feed)| CategorySummary {
                name: name.clone(),
                count: feed.total,
                last_updated: feed.last_updated,
            })
            .collect()
    }

    /// Latest articles from a single source.
    ///
    /// Unknown sources, and sources outside `category` unless it is the
    /// all-category, produce an empty list.
    pub async fn get_source_news(
        &self,
        source_id: &str,
        category: &str,
        limit: usize,
        force_refresh: bool,
    ) -> Vec<Article> {
        let Some(adapter) = self.registry.adapter_by_id(source_id) else {
            debug!("Unknown news source '{}'", source_id);
            return Vec::new();
        };

        if !is_all_category(category) && adapter.category() != category {
            debug!(
                "Source '{}' is filed under '{}', not '{}'",
                source_id,
                adapter.category(),
                category
            );
            return Vec::new();
        }

        let key = FeedKey::source(source_id, limit);
        if !force_refresh {
            if let Some(feed) = self.caches.feeds.get(&key) {
                count("news_station_feed_cache_hits");
                return feed.articles.clone();
            }
            count("news_station_feed_cache_misses");
        }

        let category = adapter.category().to_string();
        let mut articles = fan_out(vec![adapter], limit).await.into_iter().flatten().collect::<Vec<_>>();
        articles.truncate(limit);

        for article in &articles {
            self.caches.articles.insert(article.id.clone(), article.clone());
        }

        let feed = Feed {
            total: articles.len(),
            articles,
            category,
            page: 1,
            limit,
            last_updated: Utc::now(),
        };
        self.caches.feeds.insert(key, feed).articles.clone()
    }

    fn hand_to_sink(&self, articles: Vec<Article>) {
        let Some(sink) = self.sink.clone() else {
            return;
        };
        if articles.is_empty() {
            return;
        }

        tokio::spawn(async move {
            match sink.save(&articles).await {
                Ok(saved) => debug!("Persisted {} articles", saved),
                Err(e) => error!("Error saving articles: {}", e),
            }
        });
    }
}

/// Run `fetch_articles(limit)` on every adapter concurrently and wait for all
/// of them. A task that panics contributes an empty batch.
async fn fan_out(adapters: Vec<Arc<dyn NewsSource>>, limit: usize) -> Vec<Vec<Article>> {
    count("news_station_fan_outs");

    let ids: Vec<String> = adapters.iter().map(|a| a.id().to_string()).collect();
    let handles = adapters.into_iter().map(|adapter| {
        tokio::spawn(async move {
            let mut articles = adapter.fetch_articles(limit).await;
            articles.truncate(limit);
            articles
        })
    });

    join_all(handles)
        .await
        .into_iter()
        .zip(ids)
        .map(|(result, id)| match result {
            Ok(articles) => {
                debug!("Source '{}' returned {} articles", id, articles.len());
                articles
            }
            Err(e) => {
                error!("Fetch task for source '{}' failed: {}", id, e);
                count("news_station_source_failures");
                Vec::new()
            }
        })
        .collect()
}
