pub mod github_trending;
pub mod hacker_news;
pub mod reddit;
pub mod registry;
pub mod rss_feed;

use async_trait::async_trait;

use crate::content::ContentExtractor;
use crate::error::Result;
use crate::feed::fetcher::HttpClient;
use crate::feed::{Article, Source};

pub use github_trending::GithubTrendingSource;
pub use hacker_news::HackerNewsSource;
pub use reddit::RedditSource;
pub use registry::SourceRegistry;
pub use rss_feed::RssFeedSource;

/// Category that selects every registered source.
pub const ALL_CATEGORY: &str = "all";

/// Older name for [`ALL_CATEGORY`], still accepted on input.
pub const REALTIME_ALIAS: &str = "realtime";

pub fn is_all_category(category: &str) -> bool {
    category == ALL_CATEGORY || category == REALTIME_ALIAS
}

/// An upstream that can list recent articles and fetch their bodies.
///
/// Implementations never fail outward: network or parse problems are logged
/// and show up as fewer articles, or as `None` from [`fetch_content`].
///
/// [`fetch_content`]: NewsSource::fetch_content
#[async_trait]
pub trait NewsSource: Send + Sync {
    fn info(&self) -> &Source;

    fn id(&self) -> &str {
        &self.info().id
    }

    fn category(&self) -> &str {
        &self.info().category
    }

    /// Up to `limit` recent articles, in source order.
    async fn fetch_articles(&self, limit: usize) -> Vec<Article>;

    /// Readable body of the page at `url`.
    async fn fetch_content(&self, url: &str) -> Option<String>;
}

/// Download an HTML page and reduce it to readable text.
pub(crate) async fn extract_page(client: &HttpClient, extractor: &ContentExtractor, url: &str) -> Result<String> {
    let html = client.get_text(url).await?;
    extractor.extract_text(&html)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_category_alias() {
        assert!(is_all_category("all"));
        assert!(is_all_category("realtime"));
        assert!(!is_all_category("technology"));
        assert!(!is_all_category("All"));
    }
}
