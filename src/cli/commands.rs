use std::fs;
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use clap_complete::{generate, Shell};
use serde::Serialize;
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;

use crate::aggregator::{validate_pagination, NewsAggregator, MAX_PAGE_LIMIT};
use crate::cli::Cli;
use crate::config::{Config, LoggingConfig};
use crate::error::{Error, Result};
use crate::feed::Article;
use crate::storage::{ArticleSink, MemoryStorage};

/// Write a commented default configuration file
pub async fn init(config_path: Option<PathBuf>, force: bool) -> Result<()> {
    let config_file = get_config_file(config_path)?;

    if config_file.exists() && !force {
        warn!("Configuration file already exists: {}", config_file.display());
        println!("⚠️  Configuration already exists: {}", config_file.display());
        println!("   Use --force to overwrite it");
        return Ok(());
    }

    if let Some(parent) = config_file.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&config_file, create_default_config())?;
    info!("Created default configuration: {}", config_file.display());

    println!("✅ News Station initialized!");
    println!("   Config file: {}", config_file.display());
    println!();
    println!("Next steps:");
    println!("   1. Enable or disable sources in the config file");
    println!("   2. Read the latest news: news-station feed");

    Ok(())
}

/// Load configuration for a command.
///
/// An explicit path must exist. Without one the default location is used if
/// present, otherwise built-in defaults apply.
pub fn load_config(config_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = config_path {
        return Config::load_with_env(path);
    }

    let default_file = get_config_file(None)?;
    if default_file.exists() {
        return Config::load_with_env(&default_file);
    }

    debug!("No configuration at {}, using defaults", default_file.display());
    let mut config = Config::default();
    config.apply_env_overrides(|key| std::env::var(key).ok());
    config.validate()?;
    Ok(config)
}

/// Print one page of a category feed
pub async fn show_feed(
    aggregator: &NewsAggregator,
    category: &str,
    page: usize,
    limit: usize,
    refresh: bool,
    json: bool,
) -> Result<()> {
    validate_pagination(page, limit)?;
    info!("Showing feed: category={}, page={}, limit={}", category, page, limit);

    let feed = aggregator.get_feed(category, page, limit, refresh).await;
    if json {
        return print_json(feed.as_ref());
    }

    println!(
        "📰 {} (page {} of {}, {} articles)",
        feed.category,
        feed.page,
        feed.total_pages().max(1),
        feed.total
    );
    println!("   Updated: {}", feed.last_updated.format("%Y-%m-%d %H:%M:%S UTC"));

    if feed.is_empty() {
        println!("\n📭 No articles");
        return Ok(());
    }

    let offset = (page - 1) * limit;
    for (i, article) in feed.articles.iter().enumerate() {
        print_article_line(offset + i + 1, article);
    }

    Ok(())
}

/// Print a single article
pub async fn show_article(aggregator: &NewsAggregator, id: &str, refresh: bool, json: bool) -> Result<()> {
    let article = aggregator
        .get_article(id, refresh)
        .await
        .ok_or_else(|| Error::NotFound(format!("Article '{}'", id)))?;

    if json {
        return print_json(article.as_ref());
    }

    print!("{}", article.to_text());
    Ok(())
}

/// Print the full body of an article
pub async fn show_content(aggregator: &NewsAggregator, id: &str) -> Result<()> {
    let content = aggregator
        .get_article_content(id)
        .await
        .ok_or_else(|| Error::NotFound(format!("Content for article '{}'", id)))?;

    println!("{}", content);
    Ok(())
}

/// Print article counts for every configured category
pub async fn list_categories(aggregator: &NewsAggregator, json: bool, stats: bool) -> Result<()> {
    let summary = aggregator.get_category_summary().await;
    if json {
        return print_json(&summary);
    }

    println!("📋 Categories:");
    for category in &summary {
        println!(
            "   {:<15} {:>4} articles (updated {})",
            category.name,
            category.count,
            category.last_updated.format("%H:%M:%S UTC")
        );
    }

    if stats {
        let (feeds, articles) = aggregator.caches().combined_stats();
        println!();
        println!("📊 Cache:");
        for (name, stats) in [("feeds", feeds), ("articles", articles)] {
            println!(
                "   {:<15} {:>4} entries, {} hits, {} misses, {} evictions, {} expired ({:.0}% hit rate)",
                name,
                stats.total_entries,
                stats.hits,
                stats.misses,
                stats.evictions,
                stats.expirations,
                stats.hit_rate() * 100.0
            );
        }
    }

    Ok(())
}

/// Print the latest articles of one source
pub async fn show_source(
    aggregator: &NewsAggregator,
    source_id: &str,
    category: &str,
    limit: usize,
    refresh: bool,
    json: bool,
) -> Result<()> {
    validate_pagination(1, limit)?;

    let adapter = aggregator
        .registry()
        .adapter_by_id(source_id)
        .ok_or_else(|| Error::NotFound(format!("News source '{}'", source_id)))?;

    let articles = aggregator.get_source_news(source_id, category, limit, refresh).await;
    if json {
        return print_json(&articles);
    }

    println!("📡 {} ({})", adapter.info().name, adapter.category());
    if articles.is_empty() {
        println!("\n📭 No articles");
    }
    for (i, article) in articles.iter().enumerate() {
        print_article_line(i + 1, article);
    }

    Ok(())
}

/// Print the registered sources
pub async fn list_sources(aggregator: &NewsAggregator) -> Result<()> {
    println!("📡 News sources:");
    println!("=================");

    for source in aggregator.registry().all() {
        let info = source.info();
        println!("\n🔹 {} ({})", info.name, info.id);
        println!("   Category: {}", info.category);
        println!("   URL: {}", info.url);
        if let Some(description) = &info.description {
            println!("   {}", description);
        }
    }

    Ok(())
}

/// Persist the latest feed in memory and print the most engaged articles
pub async fn show_trending(aggregator: &NewsAggregator, category: &str, limit: usize, json: bool) -> Result<()> {
    validate_pagination(1, limit)?;

    let storage = MemoryStorage::new();
    let feed = aggregator.get_feed(category, 1, MAX_PAGE_LIMIT, false).await;
    storage.save(&feed.articles).await?;

    let trending: Vec<Article> = storage.trending(limit).iter().map(|a| a.as_ref().clone()).collect();
    if json {
        return print_json(&trending);
    }

    println!("🔥 Trending in {} (last 24 hours)", category);
    if trending.is_empty() {
        println!("\n📭 No articles");
    }
    for (i, article) in trending.iter().enumerate() {
        print_article_line(i + 1, article);
    }

    Ok(())
}

/// Generate shell completions
pub fn generate_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let cmd_name = cmd.get_name().to_string();
    generate(shell, &mut cmd, cmd_name, &mut std::io::stdout());
}

/// Initialize logging from the verbosity flags and the `[logging]` section.
///
/// The returned guard flushes the log file when dropped and must be kept
/// alive for the duration of the command.
pub fn init_logging(debug: bool, verbose: bool, logging: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter, Layer, Registry};

    let level = if debug {
        "debug"
    } else if verbose {
        "info"
    } else {
        logging.level.as_str()
    };
    let filter =
        EnvFilter::try_new(level).map_err(|e| Error::Config(format!("Invalid log level '{}': {}", level, e)))?;

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();

    if logging.json_format {
        layers.push(fmt::layer().json().with_writer(std::io::stderr).boxed());
    } else {
        layers.push(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_file(debug)
                .with_line_number(debug)
                .boxed(),
        );
    }

    let mut guard = None;
    if logging.log_to_file {
        let path = Path::new(&logging.log_file);
        let directory = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
        let file_name = path
            .file_name()
            .ok_or_else(|| Error::Config(format!("Invalid log file '{}'", logging.log_file)))?;

        let (writer, file_guard) = tracing_appender::non_blocking(tracing_appender::rolling::daily(directory, file_name));
        layers.push(fmt::layer().with_writer(writer).with_ansi(false).boxed());
        guard = Some(file_guard);
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|e| Error::Config(format!("Failed to initialize logging: {}", e)))?;

    debug!("Logging initialized at level {}", level);
    Ok(guard)
}

fn print_article_line(position: usize, article: &Article) {
    println!("\n{:>3}. {}", position, article.title);

    let mut meta = vec![
        article.source.name.clone(),
        article.published_at.format("%Y-%m-%d %H:%M").to_string(),
    ];
    if let Some(likes) = article.likes_count {
        meta.push(format!("▲ {}", likes));
    }
    if let Some(comments) = article.comments_count {
        meta.push(format!("💬 {}", comments));
    }

    println!("     {}", meta.join(" · "));
    println!("     {}", article.url);
    println!("     id: {}", article.id);
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Get the configuration file path
fn get_config_file(config_path: Option<PathBuf>) -> Result<PathBuf> {
    match config_path {
        Some(path) => Ok(path),
        None => Config::default_path(),
    }
}

/// Default configuration content, with every option documented
fn create_default_config() -> String {
    format!(
        r#"# News Station configuration
# Generated on {}

[settings]
# Lifetime of cached feeds and articles in seconds (default: 30 minutes)
cache_ttl = 1800

# Maximum number of cached feed pages and articles
feed_cache_capacity = 100
article_cache_capacity = 1000

# Per-request timeout in seconds
timeout = 10

# Articles pulled from a source when looking up an uncached article id
lookup_limit = 50

# Categories reported by `news-station categories`. "all" spans every source.
categories = ["all", "technology", "world", "business", "entertainment", "sports", "science", "health"]

[sources.hacker_news]
enabled = true
api_url = "https://hacker-news.firebaseio.com/v0"

[sources.reddit]
enabled = true
# Also register one source spanning every subreddit below
include_combined = true
subreddits = ["worldnews", "technology", "science", "politics", "business"]
base_url = "https://www.reddit.com"

[sources.github_trending]
enabled = true
url = "https://github.com/trending"
raw_base_url = "https://raw.githubusercontent.com"

# Any number of RSS or Atom feeds. Ids must not contain '-'.
#
# [[sources.rss]]
# id = "rust_blog"
# name = "Rust Blog"
# url = "https://blog.rust-lang.org/feed.xml"
# category = "technology"
# language = "en"
# country = "US"

[logging]
# Log level: error, warn, info, debug, trace
level = "warn"

# Emit JSON log lines
json_format = false

# Also write a daily rolling log file
log_to_file = false
log_file = "logs/news-station.log"
"#,
        chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    )
}
