use std::collections::HashSet;
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::feed::fetcher::HttpClient;
use crate::feed::{Source, ID_SEPARATOR};
use crate::sources::{
    is_all_category, GithubTrendingSource, HackerNewsSource, NewsSource, RedditSource, RssFeedSource,
};

/// The configured set of adapters.
///
/// Order is significant: it is the order in which fan-out results are
/// concatenated before sorting, so it breaks ties between equal timestamps.
#[derive(Clone)]
pub struct SourceRegistry {
    sources: Vec<Arc<dyn NewsSource>>,
}

impl std::fmt::Debug for SourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.sources.iter().map(|s| s.id())).finish()
    }
}

impl SourceRegistry {
    pub fn new(sources: Vec<Arc<dyn NewsSource>>) -> Result<Self> {
        if sources.is_empty() {
            return Err(Error::Config("At least one news source is required".to_string()));
        }

        let mut seen = HashSet::new();
        for source in &sources {
            let id = source.id();
            if id.is_empty() || id.contains(ID_SEPARATOR) {
                return Err(Error::Config(format!(
                    "Source id '{}' must be non-empty and must not contain '{}'",
                    id, ID_SEPARATOR
                )));
            }
            if !seen.insert(id.to_string()) {
                return Err(Error::Config(format!("Duplicate source id '{}'", id)));
            }
        }

        Ok(Self { sources })
    }

    /// Build every enabled adapter from configuration.
    ///
    /// When every source is disabled Hacker News is enabled anyway, so a
    /// registry built here is never empty.
    pub fn from_config(config: &Config, client: HttpClient) -> Result<Self> {
        let sources_config = &config.sources;
        let mut sources: Vec<Arc<dyn NewsSource>> = Vec::new();

        if sources_config.hacker_news.enabled {
            sources.push(Arc::new(HackerNewsSource::new(
                client.clone(),
                sources_config.hacker_news.api_url.as_str(),
            )?));
        }

        let reddit = &sources_config.reddit;
        if reddit.enabled {
            if reddit.include_combined {
                sources.push(Arc::new(RedditSource::combined(
                    client.clone(),
                    reddit.base_url.as_str(),
                    reddit.subreddits.clone(),
                )?));
            }
            for subreddit in &reddit.subreddits {
                sources.push(Arc::new(RedditSource::subreddit(
                    client.clone(),
                    reddit.base_url.as_str(),
                    subreddit,
                )?));
            }
        }

        let github = &sources_config.github_trending;
        if github.enabled {
            sources.push(Arc::new(GithubTrendingSource::new(
                client.clone(),
                &github.url,
                github.raw_base_url.as_str(),
            )?));
        }

        for feed in sources_config.rss.iter().filter(|feed| feed.enabled) {
            let mut source = Source::new(&feed.id, &feed.name, &feed.url, &feed.category)
                .with_language(&feed.language)
                .with_refresh_interval(feed.refresh_interval);
            if let Some(description) = &feed.description {
                source = source.with_description(description);
            }
            if let Some(country) = &feed.country {
                source = source.with_country(country);
            }
            sources.push(Arc::new(RssFeedSource::new(client.clone(), source)?));
        }

        if sources.is_empty() {
            warn!("All news sources are disabled, enabling Hacker News");
            sources.push(Arc::new(HackerNewsSource::new(
                client,
                sources_config.hacker_news.api_url.as_str(),
            )?));
        }

        let registry = Self::new(sources)?;
        info!("Registered {} news sources: {:?}", registry.len(), registry);
        Ok(registry)
    }

    pub fn all(&self) -> &[Arc<dyn NewsSource>] {
        &self.sources
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn ids(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.id()).collect()
    }

    /// Adapters filed under `category`, or every adapter for the all-category.
    pub fn adapters_for_category(&self, category: &str) -> Vec<Arc<dyn NewsSource>> {
        self.sources
            .iter()
            .filter(|source| is_all_category(category) || source.category() == category)
            .cloned()
            .collect()
    }

    pub fn adapter_by_id(&self, id: &str) -> Option<Arc<dyn NewsSource>> {
        self.sources.iter().find(|source| source.id() == id).cloned()
    }

    /// Find the adapter owning `token`: an exact id match, otherwise the
    /// longest registered id that `token` starts with.
    pub fn resolve(&self, token: &str) -> Option<Arc<dyn NewsSource>> {
        self.adapter_by_id(token).or_else(|| {
            self.sources
                .iter()
                .filter(|source| token.starts_with(source.id()))
                .max_by_key(|source| source.id().len())
                .cloned()
        })
    }
}
