use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use futures::future::join_all;
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use crate::content::ContentExtractor;
use crate::error::Result;
use crate::feed::fetcher::HttpClient;
use crate::feed::{Article, Author, Source};
use crate::sources::{extract_page, NewsSource};

pub const DEFAULT_API_URL: &str = "https://hacker-news.firebaseio.com/v0";

const USER_PROFILE_URL: &str = "https://news.ycombinator.com/user?id=";

#[derive(Debug, Deserialize)]
struct Story {
    id: u64,
    title: Option<String>,
    url: Option<String>,
    by: Option<String>,
    time: Option<i64>,
    descendants: Option<u64>,
    score: Option<i64>,
}

/// Top stories from the Hacker News Firebase API.
pub struct HackerNewsSource {
    source: Source,
    client: HttpClient,
    extractor: ContentExtractor,
    api_url: String,
}

impl HackerNewsSource {
    pub const ID: &'static str = "hacker_news";

    pub fn new(client: HttpClient, api_url: impl Into<String>) -> Result<Self> {
        let source = Source::new(Self::ID, "Hacker News", "https://news.ycombinator.com/", "technology")
            .with_description("Top stories from Hacker News")
            .with_refresh_interval(300);

        Ok(Self {
            source,
            client,
            extractor: ContentExtractor::new()?,
            api_url: api_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn try_fetch(&self, limit: usize) -> Result<Vec<Article>> {
        let url = format!("{}/topstories.json", self.api_url);
        let story_ids: Vec<u64> = self.client.get_json(&url).await?;
        debug!("Retrieved {} story ids from Hacker News", story_ids.len());

        let requests = story_ids.into_iter().take(limit).map(|id| self.fetch_story(id));
        let mut articles = Vec::new();

        for result in join_all(requests).await {
            match result {
                Ok(Some(article)) => articles.push(article),
                Ok(None) => {}
                Err(e) => warn!("Skipping Hacker News story: {}", e),
            }
        }

        Ok(articles)
    }

    async fn fetch_story(&self, id: u64) -> Result<Option<Article>> {
        let url = format!("{}/item/{}.json", self.api_url, id);
        // Deleted items come back as `null`.
        let story: Option<Story> = self.client.get_json(&url).await?;
        Ok(story.and_then(|story| self.to_article(story)))
    }

    fn to_article(&self, story: Story) -> Option<Article> {
        let url = story.url.filter(|url| !url.is_empty())?;
        let title = story.title.unwrap_or_else(|| format!("Story {}", story.id));
        let published_at = story
            .time
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
            .unwrap_or_else(Utc::now);

        let author = story.by.map(|name| {
            let profile = format!("{}{}", USER_PROFILE_URL, name);
            Author::new(name, Some(profile))
        });

        Some(
            Article::new(&self.source, title, url, published_at)
                .with_author(author)
                .with_tags(["hacker-news"])
                .with_counts(Some(story.descendants.unwrap_or(0)), Some(story.score.unwrap_or(0)), None),
        )
    }
}

#[async_trait]
impl NewsSource for HackerNewsSource {
    fn info(&self) -> &Source {
        &self.source
    }

    async fn fetch_articles(&self, limit: usize) -> Vec<Article> {
        match self.try_fetch(limit).await {
            Ok(articles) => {
                info!("Fetched {} articles from Hacker News", articles.len());
                articles
            }
            Err(e) => {
                error!("Error fetching articles from Hacker News: {}", e);
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
