use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::feed::fetcher::{self, validate_http_url};
use crate::feed::ID_SEPARATOR;
use crate::sources::{github_trending, hacker_news, is_all_category, reddit, ALL_CATEGORY};
use crate::storage::CacheConfig;

pub const ENV_CACHE_TTL: &str = "NEWS_STATION_CACHE_TTL";
pub const ENV_LOG_LEVEL: &str = "NEWS_STATION_LOG_LEVEL";
pub const ENV_TIMEOUT: &str = "NEWS_STATION_TIMEOUT";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub settings: Settings,
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Lifetime of cached feeds and articles, in seconds.
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl: u64,

    #[serde(default = "default_feed_cache_capacity")]
    pub feed_cache_capacity: usize,

    #[serde(default = "default_article_cache_capacity")]
    pub article_cache_capacity: usize,

    /// Per-request timeout, in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    #[serde(default = "fetcher::default_user_agent")]
    pub user_agent: String,

    /// How many articles to pull from a source when looking one up by id.
    #[serde(default = "default_lookup_limit")]
    pub lookup_limit: usize,

    #[serde(default = "default_categories")]
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourcesConfig {
    #[serde(default)]
    pub hacker_news: HackerNewsConfig,
    #[serde(default)]
    pub reddit: RedditConfig,
    #[serde(default)]
    pub github_trending: GithubTrendingConfig,
    #[serde(default)]
    pub rss: Vec<RssSourceConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HackerNewsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_hacker_news_api")]
    pub api_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedditConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Also register the adapter spanning every subreddit.
    #[serde(default = "default_true")]
    pub include_combined: bool,
    #[serde(default = "reddit::default_subreddits")]
    pub subreddits: Vec<String>,
    #[serde(default = "default_reddit_base")]
    pub base_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GithubTrendingConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_trending_url")]
    pub url: String,
    #[serde(default = "default_raw_base")]
    pub raw_base_url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RssSourceConfig {
    pub id: String,
    pub name: String,
    pub url: String,
    #[serde(default = "default_rss_category")]
    pub category: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_rss_language")]
    pub language: String,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_rss_refresh")]
    pub refresh_interval: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub json_format: bool,

    #[serde(default)]
    pub log_to_file: bool,

    #[serde(default = "default_log_file")]
    pub log_file: String,
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::NotFound(format!("Config file {}", path.as_ref().display())),
            _ => Error::Io(e),
        })?;

        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))?;
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let settings = &self.settings;

        if settings.categories.is_empty() {
            return Err(Error::Config("At least one category is required".to_string()));
        }
        if !settings.categories.iter().any(|c| is_all_category(c)) {
            return Err(Error::Config(format!("Categories must include '{}'", ALL_CATEGORY)));
        }
        if settings.cache_ttl == 0 {
            return Err(Error::Config("Cache TTL must be greater than 0".to_string()));
        }
        if settings.feed_cache_capacity == 0 || settings.article_cache_capacity == 0 {
            return Err(Error::Config("Cache capacities must be greater than 0".to_string()));
        }
        if settings.timeout == 0 {
            return Err(Error::Config("Timeout must be greater than 0".to_string()));
        }
        if settings.lookup_limit == 0 {
            return Err(Error::Config("Lookup limit must be greater than 0".to_string()));
        }

        let sources = &self.sources;
        validate_http_url(&sources.hacker_news.api_url)?;
        validate_http_url(&sources.reddit.base_url)?;
        validate_http_url(&sources.github_trending.url)?;
        validate_http_url(&sources.github_trending.raw_base_url)?;

        for subreddit in &sources.reddit.subreddits {
            if subreddit.is_empty() || subreddit.contains(ID_SEPARATOR) || subreddit.contains('/') {
                return Err(Error::Config(format!("Invalid subreddit name '{}'", subreddit)));
            }
        }

        for feed in &sources.rss {
            if feed.id.is_empty() || feed.id.contains(ID_SEPARATOR) {
                return Err(Error::Config(format!(
                    "RSS source id '{}' must be non-empty and must not contain '{}'",
                    feed.id, ID_SEPARATOR
                )));
            }
            validate_http_url(&feed.url)?;
        }

        Ok(())
    }

    /// Apply `NEWS_STATION_*` overrides looked up through `lookup`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(ttl) = lookup(ENV_CACHE_TTL).and_then(|v| v.parse().ok()) {
            self.settings.cache_ttl = ttl;
        }

        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            self.logging.level = level;
        }

        if let Some(timeout) = lookup(ENV_TIMEOUT).and_then(|v| v.parse().ok()) {
            self.settings.timeout = timeout;
        }
    }

    pub fn config_dir() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join("news-station"))
            .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))
    }

    pub fn default_path() -> Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }
}

impl Settings {
    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn cache_config(&self) -> CacheConfig {
        CacheConfig {
            ttl: Duration::from_secs(self.cache_ttl),
            feed_capacity: self.feed_cache_capacity,
            article_capacity: self.article_cache_capacity,
        }
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cache_ttl: default_cache_ttl(),
            feed_cache_capacity: default_feed_cache_capacity(),
            article_cache_capacity: default_article_cache_capacity(),
            timeout: default_timeout(),
            user_agent: fetcher::default_user_agent(),
            lookup_limit: default_lookup_limit(),
            categories: default_categories(),
        }
    }
}

impl Default for HackerNewsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_url: default_hacker_news_api(),
        }
    }
}

impl Default for RedditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            include_combined: true,
            subreddits: reddit::default_subreddits(),
            base_url: default_reddit_base(),
        }
    }
}

impl Default for GithubTrendingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            url: default_trending_url(),
            raw_base_url: default_raw_base(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json_format: false,
            log_to_file: false,
            log_file: default_log_file(),
        }
    }
}

fn default_cache_ttl() -> u64 { 1800 }
fn default_feed_cache_capacity() -> usize { 100 }
fn default_article_cache_capacity() -> usize { 1000 }
fn default_timeout() -> u64 { 10 }
fn default_lookup_limit() -> usize { 50 }
fn default_true() -> bool { true }

fn default_categories() -> Vec<String> {
    [ALL_CATEGORY, "technology", "world", "business", "entertainment", "sports", "science", "health"]
        .iter()
        .map(|c| c.to_string())
        .collect()
}

fn default_hacker_news_api() -> String { hacker_news::DEFAULT_API_URL.to_string() }
fn default_reddit_base() -> String { reddit::DEFAULT_BASE_URL.to_string() }
fn default_trending_url() -> String { github_trending::DEFAULT_TRENDING_URL.to_string() }
fn default_raw_base() -> String { github_trending::DEFAULT_RAW_BASE_URL.to_string() }
fn default_rss_category() -> String { ALL_CATEGORY.to_string() }
fn default_rss_refresh() -> u64 { 900 }
fn default_rss_language() -> String { "en".to_string() }

fn default_log_level() -> String { "warn".to_string() }
fn default_log_file() -> String { "logs/news-station.log".to_string() }

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        config.validate().unwrap();

        assert_eq!(config.settings.cache_ttl, 1800);
        assert_eq!(config.settings.feed_cache_capacity, 100);
        assert_eq!(config.settings.article_cache_capacity, 1000);
        assert_eq!(config.settings.categories[0], "all");
        assert_eq!(config.sources.reddit.subreddits.len(), 5);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
[settings]
cache_ttl = 60

[sources.reddit]
subreddits = ["rust"]

[[sources.rss]]
id = "lwn"
name = "LWN"
url = "https://lwn.net/headlines/rss"
category = "technology"
"#,
        )
        .unwrap();

        assert_eq!(config.settings.cache_ttl, 60);
        assert_eq!(config.settings.timeout, 10);
        assert!(config.sources.reddit.include_combined);
        assert_eq!(config.sources.reddit.subreddits, vec!["rust"]);
        assert_eq!(config.sources.rss[0].refresh_interval, 900);
        assert_eq!(config.sources.rss[0].language, "en");
        assert!(config.sources.rss[0].country.is_none());
        assert!(config.sources.rss[0].enabled);
        assert_eq!(config.logging.level, "warn");
        config.validate().unwrap();
    }

    #[test]
    fn test_validation_failures() {
        let mut config = Config::default();
        config.settings.categories = vec!["technology".to_string()];
        assert!(matches!(config.validate(), Err(Error::Config(_))));

        let mut config = Config::default();
        config.settings.categories = vec!["realtime".to_string()];
        config.validate().unwrap();

        let mut config = Config::default();
        config.settings.cache_ttl = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.sources.hacker_news.api_url = "ftp://example.com".to_string();
        assert!(matches!(config.validate(), Err(Error::InvalidUrl(_))));

        let mut config = Config::default();
        config.sources.rss.push(RssSourceConfig {
            id: "bad-id".to_string(),
            name: "Bad".to_string(),
            url: "https://example.com/feed".to_string(),
            category: "all".to_string(),
            description: None,
            language: "en".to_string(),
            country: None,
            enabled: true,
            refresh_interval: 900,
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            (ENV_CACHE_TTL, "120"),
            (ENV_LOG_LEVEL, "debug"),
            (ENV_TIMEOUT, "not-a-number"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_env_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(config.settings.cache_ttl, 120);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.settings.timeout, 10);
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.settings.lookup_limit = 25;
        config.save(&path).unwrap();

        let loaded = Config::load(&path).unwrap();
        assert_eq!(loaded.settings.lookup_limit, 25);
        assert_eq!(loaded.sources.github_trending.url, "https://github.com/trending");
    }

    #[test]
    fn test_missing_file() {
        let result = Config::load("/nonexistent/news-station.toml");
        assert!(matches!(result, Err(Error::NotFound(_))));
    }

    #[test]
    fn test_unreadable_file_is_io_error() {
        let temp_dir = tempdir().unwrap();
        let result = Config::load(temp_dir.path());
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_cache_config_conversion() {
        let cache = Settings::default().cache_config();
        assert_eq!(cache.ttl, Duration::from_secs(1800));
        assert_eq!(cache.article_capacity, 1000);
    }
}
