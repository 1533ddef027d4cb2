use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use futures::future::join_all;
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use crate::content::ContentExtractor;
use crate::error::{Error, Result};
use crate::feed::fetcher::HttpClient;
use crate::feed::{Article, Author, Source};
use crate::sources::{extract_page, NewsSource, ALL_CATEGORY};

pub const DEFAULT_BASE_URL: &str = "https://www.reddit.com";

/// Self posts shorter than this are discussion stubs, not articles.
const MIN_SELFTEXT_LEN: usize = 100;
const SUMMARY_LEN: usize = 200;
const MIN_POSTS_PER_SUBREDDIT: usize = 3;

pub fn default_subreddits() -> Vec<String> {
    ["worldnews", "technology", "science", "politics", "business"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

/// Category a subreddit's posts are filed under.
pub fn category_for_subreddit(subreddit: &str) -> &'static str {
    match subreddit {
        "worldnews" | "politics" => "world",
        "technology" => "technology",
        "science" => "science",
        "business" => "business",
        _ => ALL_CATEGORY,
    }
}

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Child>,
}

#[derive(Debug, Deserialize)]
struct Child {
    data: Post,
}

#[derive(Debug, Deserialize)]
struct Post {
    title: String,
    url: Option<String>,
    #[serde(default)]
    permalink: String,
    #[serde(default)]
    selftext: String,
    #[serde(default)]
    is_self: bool,
    author: Option<String>,
    created_utc: Option<f64>,
    num_comments: Option<u64>,
    score: Option<i64>,
    thumbnail: Option<String>,
    preview: Option<Preview>,
}

#[derive(Debug, Deserialize)]
struct Preview {
    #[serde(default)]
    images: Vec<PreviewImage>,
}

#[derive(Debug, Deserialize)]
struct PreviewImage {
    source: ImageSource,
}

#[derive(Debug, Deserialize)]
struct ImageSource {
    url: String,
}

/// Top posts of the day from one or more subreddits.
///
/// The combined adapter (`reddit`) spans every configured subreddit; the
/// per-subreddit adapters (`reddit_{name}`) are registered alongside it so a
/// category feed only pulls the subreddits filed under that category.
pub struct RedditSource {
    source: Source,
    client: HttpClient,
    extractor: ContentExtractor,
    base_url: String,
    subreddits: Vec<String>,
}

impl RedditSource {
    pub const ID: &'static str = "reddit";

    pub fn combined(client: HttpClient, base_url: impl Into<String>, subreddits: Vec<String>) -> Result<Self> {
        let base_url = normalize_base(base_url.into());
        let source = Source::new(Self::ID, "Reddit", format!("{}/", base_url), ALL_CATEGORY)
            .with_description("Top posts of the day across subreddits")
            .with_refresh_interval(600);

        Self::build(source, client, base_url, subreddits)
    }

    pub fn subreddit(client: HttpClient, base_url: impl Into<String>, subreddit: &str) -> Result<Self> {
        let base_url = normalize_base(base_url.into());
        let source = Source::new(
            format!("{}_{}", Self::ID, subreddit),
            format!("Reddit r/{}", subreddit),
            format!("{}/r/{}/", base_url, subreddit),
            category_for_subreddit(subreddit),
        )
        .with_refresh_interval(600);

        Self::build(source, client, base_url, vec![subreddit.to_string()])
    }

    fn build(source: Source, client: HttpClient, base_url: String, subreddits: Vec<String>) -> Result<Self> {
        Ok(Self {
            source,
            client,
            extractor: ContentExtractor::new()?,
            base_url,
            subreddits,
        })
    }

    pub fn subreddits(&self) -> &[String] {
        &self.subreddits
    }

    async fn try_fetch(&self, limit: usize) -> Result<Vec<Article>> {
        if self.subreddits.is_empty() {
            return Ok(Vec::new());
        }

        let per_subreddit = (limit / self.subreddits.len()).max(MIN_POSTS_PER_SUBREDDIT);
        let requests = self
            .subreddits
            .iter()
            .map(|subreddit| self.fetch_subreddit(subreddit, per_subreddit));

        let mut articles = Vec::new();
        let mut failures = 0;
        for (subreddit, result) in self.subreddits.iter().zip(join_all(requests).await) {
            match result {
                Ok(batch) => {
                    debug!("Retrieved {} posts from r/{}", batch.len(), subreddit);
                    articles.extend(batch);
                }
                Err(e) => {
                    warn!("Error fetching posts from r/{}: {}", subreddit, e);
                    failures += 1;
                }
            }
        }

        if failures == self.subreddits.len() {
            return Err(Error::Http(format!("All {} subreddits failed", failures)));
        }

        articles.sort_by(|a, b| b.likes_count.unwrap_or(0).cmp(&a.likes_count.unwrap_or(0)));
        articles.truncate(limit);
        Ok(articles)
    }

    async fn fetch_subreddit(&self, subreddit: &str, count: usize) -> Result<Vec<Article>> {
        let url = format!("{}/r/{}/top.json?limit={}&t=day", self.base_url, subreddit, count);
        let listing: Listing = self.client.get_json(&url).await?;

        Ok(listing
            .data
            .children
            .into_iter()
            .filter_map(|child| self.to_article(child.data, subreddit))
            .collect())
    }

    fn to_article(&self, post: Post, subreddit: &str) -> Option<Article> {
        if post.is_self && post.selftext.chars().count() < MIN_SELFTEXT_LEN {
            return None;
        }

        let url = if post.is_self {
            format!("{}{}", self.base_url, post.permalink)
        } else {
            post.url.filter(|url| !url.is_empty())?
        };

        let published_at = post
            .created_utc
            .and_then(|secs| Utc.timestamp_opt(secs as i64, 0).single())
            .unwrap_or_else(Utc::now);

        let author = post.author.map(|name| {
            let profile = format!("{}/user/{}", self.base_url, name);
            Author::new(name, Some(profile))
        });

        let image_url = post
            .thumbnail
            .filter(|thumb| thumb.starts_with("http"))
            .or_else(|| {
                post.preview
                    .and_then(|preview| preview.images.into_iter().next())
                    .map(|image| image.source.url)
            });

        let (summary, content) = if post.selftext.is_empty() {
            (None, None)
        } else {
            (Some(post.selftext.chars().take(SUMMARY_LEN).collect()), Some(post.selftext))
        };

        Some(
            Article::new(&self.source, post.title, url, published_at)
                .with_category(category_for_subreddit(subreddit))
                .with_summary(summary)
                .with_content(content)
                .with_author(author)
                .with_image_url(image_url)
                .with_tags(["reddit".to_string(), format!("r/{}", subreddit)])
                .with_counts(Some(post.num_comments.unwrap_or(0)), Some(post.score.unwrap_or(0)), None),
        )
    }

    async fn fetch_post_text(&self, url: &str) -> Result<Option<String>> {
        let json_url = format!("{}.json", url.trim_end_matches('/'));
        let listings: Vec<Listing> = self.client.get_json(&json_url).await?;

        let post = listings
            .into_iter()
            .next()
            .and_then(|listing| listing.data.children.into_iter().next())
            .ok_or_else(|| Error::Parse(format!("No post in {}", json_url)))?;

        Ok(Some(post.data.selftext).filter(|text| !text.is_empty()))
    }
}

fn normalize_base(base_url: String) -> String {
    base_url.trim_end_matches('/').to_string()
}

#[async_trait]
impl NewsSource for RedditSource {
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
                error!("Error fetching articles from {}: {}", self.source.name, e);
                Vec::new()
            }
        }
    }

    async fn fetch_content(&self, url: &str) -> Option<String> {
        let result = if url.starts_with(&self.base_url) {
            self.fetch_post_text(url).await
        } else {
            extract_page(&self.client, &self.extractor, url).await.map(Some)
        };

        result
            .map_err(|e| error!("Error fetching content from {}: {}", url, e))
            .ok()
            .flatten()
    }
}
