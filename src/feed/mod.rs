pub mod fetcher;
pub mod parser;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of hex characters of the URL hash kept in an article id.
const ID_HASH_LEN: usize = 32;

/// Separator between the owning source id and the source-local part of an article id.
pub const ID_SEPARATOR: char = '-';

/// Build the canonical `{source_id}-{hash}` identifier for an article URL.
///
/// The hash is derived from the URL only, so repeated fetches of the same
/// item always produce the same id.
pub fn article_id(source_id: &str, url: &str) -> String {
    let hash = blake3::hash(url.as_bytes());
    let hex = hash.to_hex();
    format!("{}{}{}", source_id, ID_SEPARATOR, &hex[..ID_HASH_LEN])
}

/// Split an article id into its source token and the source-local part.
pub fn split_article_id(article_id: &str) -> Option<(&str, &str)> {
    article_id
        .split_once(ID_SEPARATOR)
        .filter(|(source, local)| !source.is_empty() && !local.is_empty())
}

/// Upstream source an article belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub id: String,
    pub name: String,
    pub url: String,
    pub description: Option<String>,
    pub category: String,
    #[serde(default = "default_language")]
    pub language: String,
    pub country: Option<String>,
    /// Suggested upstream refresh period in seconds.
    #[serde(default)]
    pub refresh_interval: u64,
}

fn default_language() -> String {
    "en".to_string()
}

impl Source {
    pub fn new(id: impl Into<String>, name: impl Into<String>, url: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            url: url.into(),
            description: None,
            category: category.into(),
            language: default_language(),
            country: None,
            refresh_interval: 0,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_refresh_interval(mut self, seconds: u64) -> Self {
        self.refresh_interval = seconds;
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub name: String,
    pub url: Option<String>,
}

impl Author {
    pub fn new(name: impl Into<String>, url: Option<String>) -> Self {
        Self { name: name.into(), url }
    }
}

/// A normalized news item.
///
/// Built once by a source adapter and never mutated afterwards; the `with_*`
/// methods are only used while the adapter assembles it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Article {
    pub id: String,
    pub title: String,
    pub url: String,
    pub summary: Option<String>,
    pub content: Option<String>,
    pub published_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub author: Option<Author>,
    pub source: Source,
    pub category: String,
    pub tags: Vec<String>,
    pub image_url: Option<String>,
    pub comments_count: Option<u64>,
    pub likes_count: Option<i64>,
    pub views_count: Option<u64>,
}

impl Article {
    pub fn new(source: &Source, title: impl Into<String>, url: impl Into<String>, published_at: DateTime<Utc>) -> Self {
        let url = url.into();
        Self {
            id: article_id(&source.id, &url),
            title: title.into(),
            url,
            summary: None,
            content: None,
            published_at,
            updated_at: None,
            author: None,
            source: source.clone(),
            category: source.category.clone(),
            tags: Vec::new(),
            image_url: None,
            comments_count: None,
            likes_count: None,
            views_count: None,
        }
    }

    pub fn with_summary(mut self, summary: Option<String>) -> Self {
        self.summary = summary.filter(|s| !s.trim().is_empty());
        self
    }

    pub fn with_content(mut self, content: Option<String>) -> Self {
        self.content = content.filter(|c| !c.trim().is_empty());
        self
    }

    pub fn with_updated_at(mut self, updated_at: Option<DateTime<Utc>>) -> Self {
        self.updated_at = updated_at;
        self
    }

    pub fn with_author(mut self, author: Option<Author>) -> Self {
        self.author = author;
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Append tags, skipping blanks and ones already present.
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for tag in tags {
            let tag = tag.into();
            if !tag.trim().is_empty() && !self.tags.contains(&tag) {
                self.tags.push(tag);
            }
        }
        self
    }

    pub fn with_image_url(mut self, image_url: Option<String>) -> Self {
        self.image_url = image_url;
        self
    }

    pub fn with_counts(mut self, comments: Option<u64>, likes: Option<i64>, views: Option<u64>) -> Self {
        self.comments_count = comments;
        self.likes_count = likes;
        self.views_count = views;
        self
    }

    /// Sum of all interaction counters, used for trending order.
    pub fn engagement(&self) -> i64 {
        let comments = self.comments_count.unwrap_or(0) as i64;
        let views = self.views_count.unwrap_or(0) as i64;
        comments
            .saturating_add(self.likes_count.unwrap_or(0))
            .saturating_add(views)
    }

    /// Plain text rendering used by the CLI.
    pub fn to_text(&self) -> String {
        let mut text = String::new();

        text.push_str(&format!("Title: {}\n", self.title));
        text.push_str(&format!("Id: {}\n", self.id));
        text.push_str(&format!("Source: {} ({})\n", self.source.name, self.category));

        if let Some(author) = &self.author {
            text.push_str(&format!("Author: {}\n", author.name));
        }

        text.push_str(&format!("Published: {}\n", self.published_at.format("%Y-%m-%d %H:%M:%S UTC")));
        text.push_str(&format!("Link: {}\n", self.url));

        if !self.tags.is_empty() {
            text.push_str(&format!("Tags: {}\n", self.tags.join(", ")));
        }

        let counters: Vec<String> = [
            self.likes_count.map(|n| format!("{} points", n)),
            self.comments_count.map(|n| format!("{} comments", n)),
            self.views_count.map(|n| format!("{} views", n)),
        ]
        .into_iter()
        .flatten()
        .collect();
        if !counters.is_empty() {
            text.push_str(&format!("Stats: {}\n", counters.join(", ")));
        }

        if let Some(summary) = &self.summary {
            text.push_str("\n");
            text.push_str(summary);
            text.push('\n');
        }

        text
    }
}

/// One page of merged articles for a category.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feed {
    pub articles: Vec<Article>,
    pub category: String,
    pub page: usize,
    pub limit: usize,
    /// Number of merged articles across all pages of this fetch.
    pub total: usize,
    pub last_updated: DateTime<Utc>,
}

impl Feed {
    pub fn empty(category: impl Into<String>, page: usize, limit: usize) -> Self {
        Self {
            articles: Vec::new(),
            category: category.into(),
            page,
            limit,
            total: 0,
            last_updated: Utc::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }

    pub fn total_pages(&self) -> usize {
        if self.limit == 0 {
            0
        } else {
            (self.total + self.limit - 1) / self.limit
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategorySummary {
    pub name: String,
    pub count: usize,
    pub last_updated: DateTime<Utc>,
}
