use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use tracing::debug;

use crate::error::Result;
use crate::feed::Article;

/// Destination for aggregated articles.
///
/// The aggregator hands every merged batch to its sink in a detached task and
/// never waits on the outcome, so implementations own their error reporting.
#[async_trait]
pub trait ArticleSink: Send + Sync {
    /// Upsert `articles` by id and associate their tags by name.
    /// Returns the number of articles written.
    async fn save(&self, articles: &[Article]) -> Result<usize>;
}

/// Storage statistics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StorageStats {
    pub total_articles: usize,
    pub total_tags: usize,
    pub inserted: u64,
    pub updated: u64,
    pub last_save: Option<DateTime<Utc>>,
}

#[derive(Default)]
struct Tables {
    articles: HashMap<String, Arc<Article>>,
    /// Tag name to the ids of articles carrying it.
    tags: HashMap<String, BTreeSet<String>>,
    stats: StorageStats,
}

/// In-memory article store.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_article(&self, article_id: &str) -> Option<Arc<Article>> {
        self.tables.read().articles.get(article_id).cloned()
    }

    pub fn articles_count(&self) -> usize {
        self.tables.read().articles.len()
    }

    /// Articles associated with `tag`, ordered by id.
    pub fn articles_with_tag(&self, tag: &str) -> Vec<Arc<Article>> {
        let tables = self.tables.read();
        tables
            .tags
            .get(tag)
            .map(|ids| ids.iter().filter_map(|id| tables.articles.get(id).cloned()).collect())
            .unwrap_or_default()
    }

    /// Articles published within the last day, most engaged first.
    pub fn trending(&self, limit: usize) -> Vec<Arc<Article>> {
        self.trending_at(Utc::now(), limit)
    }

    pub fn trending_at(&self, now: DateTime<Utc>, limit: usize) -> Vec<Arc<Article>> {
        let since = now - Duration::days(1);
        let mut recent: Vec<Arc<Article>> = self
            .tables
            .read()
            .articles
            .values()
            .filter(|article| article.published_at >= since)
            .cloned()
            .collect();

        recent.sort_by(|a, b| b.engagement().cmp(&a.engagement()).then_with(|| a.id.cmp(&b.id)));
        recent.truncate(limit);
        recent
    }

    pub fn stats(&self) -> StorageStats {
        self.tables.read().stats.clone()
    }
}

#[async_trait]
impl ArticleSink for MemoryStorage {
    async fn save(&self, articles: &[Article]) -> Result<usize> {
        let mut tables = self.tables.write();

        for article in articles {
            if let Some(previous) = tables.articles.get(&article.id).cloned() {
                // Tags dropped by the new version must not keep pointing at it.
                for tag in previous.tags.iter().filter(|t| !article.tags.contains(*t)) {
                    if let Some(ids) = tables.tags.get_mut(tag) {
                        ids.remove(&article.id);
                    }
                }
                tables.stats.updated += 1;
            } else {
                tables.stats.inserted += 1;
            }

            for tag in &article.tags {
                tables
                    .tags
                    .entry(tag.clone())
                    .or_default()
                    .insert(article.id.clone());
            }
            tables.articles.insert(article.id.clone(), Arc::new(article.clone()));
        }

        tables.tags.retain(|_, ids| !ids.is_empty());
        tables.stats.total_articles = tables.articles.len();
        tables.stats.total_tags = tables.tags.len();
        tables.stats.last_save = Some(Utc::now());

        debug!("Saved {} articles ({} stored)", articles.len(), tables.articles.len());
        Ok(articles.len())
    }
}
