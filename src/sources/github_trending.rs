use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use select::document::Document;
use select::node::Node;
use select::predicate::{Attr, Class, Name, Predicate};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::error::{Error, Result};
use crate::feed::fetcher::{validate_http_url, HttpClient};
use crate::feed::{Article, Author, Source};
use crate::sources::NewsSource;

pub const DEFAULT_TRENDING_URL: &str = "https://github.com/trending";
pub const DEFAULT_RAW_BASE_URL: &str = "https://raw.githubusercontent.com";

const README_BRANCHES: [&str; 2] = ["main", "master"];

/// One row of the trending page.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendingRepo {
    pub owner: String,
    pub name: String,
    pub description: Option<String>,
    pub stars: i64,
    pub language: Option<String>,
}

impl TrendingRepo {
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

/// Parse the `article.Box-row` entries of a GitHub trending page.
pub fn parse_trending_page(html: &str) -> Vec<TrendingRepo> {
    let document = Document::from(html);

    document
        .find(Name("article").and(Class("Box-row")))
        .enumerate()
        .filter_map(|(i, row)| {
            let repo = parse_row(&row);
            if repo.is_none() {
                warn!("Could not find repository path for trending row {}", i + 1);
            }
            repo
        })
        .collect()
}

fn parse_row(row: &Node) -> Option<TrendingRepo> {
    let href = row
        .find(Name("h2").descendant(Name("a")))
        .next()
        .and_then(|link| link.attr("href"))?;

    let mut parts = href.trim().trim_matches('/').split('/');
    let owner = parts.next().filter(|s| !s.is_empty())?.to_string();
    let name = parts.next().filter(|s| !s.is_empty())?.to_string();

    let description = row
        .find(Name("p"))
        .next()
        .map(|p| collapse_whitespace(&p.text()))
        .filter(|d| !d.is_empty());

    let stars = row
        .find(Name("a").and(Class("Link--muted")))
        .next()
        .map(|a| a.text().chars().filter(char::is_ascii_digit).collect::<String>())
        .and_then(|digits| digits.parse().ok())
        .unwrap_or(0);

    let language = row
        .find(Name("span").and(Attr("itemprop", "programmingLanguage")))
        .next()
        .map(|span| span.text().trim().to_string())
        .filter(|l| !l.is_empty());

    Some(TrendingRepo {
        owner,
        name,
        description,
        stars,
        language,
    })
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Trending repositories scraped from GitHub, with READMEs as content.
pub struct GithubTrendingSource {
    source: Source,
    client: HttpClient,
    site_url: String,
    raw_base_url: String,
}

impl GithubTrendingSource {
    pub const ID: &'static str = "github_trending";

    pub fn new(client: HttpClient, trending_url: &str, raw_base_url: impl Into<String>) -> Result<Self> {
        let parsed = validate_http_url(trending_url)?;
        let site_url = parsed.origin().ascii_serialization();

        let source = Source::new(Self::ID, "GitHub Trending", trending_url, "technology")
            .with_description("Repositories trending on GitHub today")
            .with_refresh_interval(3600);

        Ok(Self {
            source,
            client,
            site_url,
            raw_base_url: raw_base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn to_article(&self, repo: TrendingRepo, published_at: DateTime<Utc>) -> Article {
        let url = format!("{}/{}", self.site_url, repo.full_name());
        let author = Author::new(repo.owner.clone(), Some(format!("{}/{}", self.site_url, repo.owner)));

        let mut tags = vec!["github-trending".to_string()];
        tags.extend(repo.language.as_ref().map(|l| l.to_lowercase()));

        Article::new(&self.source, repo.full_name(), url, published_at)
            .with_summary(repo.description)
            .with_author(Some(author))
            .with_tags(tags)
            .with_counts(None, Some(repo.stars), None)
    }

    async fn try_fetch(&self, limit: usize) -> Result<Vec<Article>> {
        let html = self.client.get_text(&self.source.url).await?;
        let repos = parse_trending_page(&html);
        debug!("Found {} repositories on GitHub trending page", repos.len());

        // The page carries no timestamps; rank order stands in for recency.
        let now = Utc::now();
        Ok(repos
            .into_iter()
            .take(limit)
            .enumerate()
            .map(|(i, repo)| self.to_article(repo, now - Duration::hours(i as i64)))
            .collect())
    }

    async fn fetch_readme(&self, url: &str) -> Result<String> {
        let parsed = Url::parse(url).map_err(|e| Error::InvalidUrl(format!("{}: {}", url, e)))?;
        let repo_path = parsed.path().trim_matches('/');
        if repo_path.split('/').count() < 2 {
            return Err(Error::InvalidUrl(format!("Not a repository URL: {}", url)));
        }

        let mut last_error = Error::NotFound(format!("README for {}", repo_path));
        for branch in README_BRANCHES {
            let readme_url = format!("{}/{}/{}/README.md", self.raw_base_url, repo_path, branch);
            match self.client.get_text(&readme_url).await {
                Ok(text) => return Ok(text),
                Err(e) => {
                    debug!("No README on {} for {}: {}", branch, repo_path, e);
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }
}

#[async_trait]
impl NewsSource for GithubTrendingSource {
    fn info(&self) -> &Source {
        &self.source
    }

    async fn fetch_articles(&self, limit: usize) -> Vec<Article> {
        match self.try_fetch(limit).await {
            Ok(articles) => {
                info!("Fetched {} articles from GitHub Trending", articles.len());
                articles
            }
            Err(e) => {
                error!("Error fetching trending repositories from GitHub: {}", e);
                Vec::new()
            }
        }
    }

    async fn fetch_content(&self, url: &str) -> Option<String> {
        self.fetch_readme(url)
            .await
            .map_err(|e| error!("Error fetching README content from {}: {}", url, e))
            .ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const TRENDING_HTML: &str = r#"<html><body>
<article class="Box-row">
  <h2 class="h3 lh-condensed"><a href="/rust-lang/rust">rust-lang / rust</a></h2>
  <p class="col-9 color-fg-muted my-1 pr-4">
    Empowering everyone to build reliable and efficient software.
  </p>
  <div class="f6 color-fg-muted mt-2">
    <span itemprop="programmingLanguage">Rust</span>
    <a class="Link--muted d-inline-block mr-3" href="/rust-lang/rust/stargazers">98,765</a>
    <a class="Link--muted d-inline-block mr-3" href="/rust-lang/rust/forks">12,345</a>
  </div>
</article>
<article class="Box-row">
  <h2><a href="/tokio-rs/tokio">tokio-rs / tokio</a></h2>
  <div><a class="Link--muted" href="/tokio-rs/tokio/stargazers">25,000</a></div>
</article>
<article class="Box-row"><h2>No link here</h2></article>
<article class="Box-row">
  <h2><a href="/serde-rs/serde">serde-rs / serde</a></h2>
</article>
</body></html>"#;

    #[test]
    fn test_parse_trending_page() {
        let repos = parse_trending_page(TRENDING_HTML);

        assert_eq!(repos.len(), 3);
        assert_eq!(
            repos[0],
            TrendingRepo {
                owner: "rust-lang".to_string(),
                name: "rust".to_string(),
                description: Some("Empowering everyone to build reliable and efficient software.".to_string()),
                stars: 98765,
                language: Some("Rust".to_string()),
            }
        );
        assert_eq!(repos[1].stars, 25000);
        assert!(repos[1].description.is_none());
        assert!(repos[1].language.is_none());
        assert_eq!(repos[2].stars, 0);
    }

    #[tokio::test]
    async fn test_fetch_articles() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/trending"))
            .respond_with(ResponseTemplate::new(200).set_body_string(TRENDING_HTML))
            .mount(&server)
            .await;

        let trending = GithubTrendingSource::new(
            HttpClient::with_defaults().unwrap(),
            &format!("{}/trending", server.uri()),
            server.uri(),
        )
        .unwrap();
        let articles = trending.fetch_articles(2).await;

        assert_eq!(articles.len(), 2);
        let first = &articles[0];
        assert_eq!(first.title, "rust-lang/rust");
        assert_eq!(first.url, format!("{}/rust-lang/rust", server.uri()));
        assert_eq!(first.tags, vec!["github-trending", "rust"]);
        assert_eq!(first.likes_count, Some(98765));
        assert_eq!(first.author.as_ref().unwrap().name, "rust-lang");
        assert_eq!(first.category, "technology");

        assert_eq!(articles[1].tags, vec!["github-trending"]);
        assert!(articles[0].published_at > articles[1].published_at);
    }

    #[tokio::test]
    async fn test_readme_falls_back_to_master() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/old/project/main/README.md"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/old/project/master/README.md"))
            .respond_with(ResponseTemplate::new(200).set_body_string("# Old project"))
            .mount(&server)
            .await;

        let trending =
            GithubTrendingSource::new(HttpClient::with_defaults().unwrap(), DEFAULT_TRENDING_URL, server.uri())
                .unwrap();

        let readme = trending.fetch_content("https://github.com/old/project").await;
        assert_eq!(readme.as_deref(), Some("# Old project"));

        assert!(trending.fetch_content("https://github.com/missing/repo").await.is_none());
        assert!(trending.fetch_content("https://github.com/").await.is_none());
    }
}
