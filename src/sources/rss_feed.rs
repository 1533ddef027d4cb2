use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tracing::{error, info};

use crate::content::ContentExtractor;
use crate::error::Result;
use crate::feed::fetcher::{validate_http_url, HttpClient};
use crate::feed::parser::ParsedEntry;
use crate::feed::{Article, Author, Source};
use crate::sources::{extract_page, NewsSource};

const SUMMARY_WIDTH: usize = 200;

/// Any RSS or Atom feed listed in the configuration.
pub struct RssFeedSource {
    source: Source,
    client: HttpClient,
    extractor: ContentExtractor,
}

impl RssFeedSource {
    pub fn new(client: HttpClient, source: Source) -> Result<Self> {
        validate_http_url(&source.url)?;

        Ok(Self {
            source,
            client,
            extractor: ContentExtractor::new()?,
        })
    }

    fn to_article(&self, entry: ParsedEntry, fetched_at: DateTime<Utc>) -> Article {
        let published_at = entry.published.or(entry.updated).unwrap_or(fetched_at);
        let summary = entry.description.map(|html| plain_text(&html));

        Article::new(&self.source, entry.title, entry.link, published_at)
            .with_updated_at(entry.updated)
            .with_summary(summary)
            .with_content(entry.content)
            .with_author(entry.author.map(|name| Author::new(name, None)))
            .with_tags(entry.categories)
    }

    async fn try_fetch(&self, limit: usize) -> Result<Vec<Article>> {
        let feed = self.client.fetch_feed(&self.source.url).await?;
        let fetched_at = Utc::now();

        Ok(feed
            .entries
            .into_iter()
            .take(limit)
            .map(|entry| self.to_article(entry, fetched_at))
            .collect())
    }
}

/// Feed descriptions are often HTML fragments.
fn plain_text(html: &str) -> String {
    if html.contains('<') {
        html2text::from_read(html.as_bytes(), SUMMARY_WIDTH).trim().to_string()
    } else {
        html.trim().to_string()
    }
}

#[async_trait]
impl NewsSource for RssFeedSource {
    fn info(&self) -> &Source {
        &self.source
    }

    async fn fetch_articles(&self, limit: usize) -> Vec<Article> {
        match self.try_fetch(limit).await {
            Ok(articles) => {
                info!("Fetched {} articles from {}", articles.len(), self.source.name);
                articles
            }
            Err(e) => {
                error!("Error fetching feed {}: {}", self.source.url, e);
                Vec::new()
            }
        }
    }

    async fn fetch_content(&self, url: &str) -> Option<String> {
        extract_page(&self.client, &self.extractor, url)
            .await
            .map_err(|e| error!("Error fetching article content from {}: {}", url, e))
            .ok()
    }
}
