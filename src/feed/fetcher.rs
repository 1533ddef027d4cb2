use crate::error::{Error, Result};
use crate::feed::parser::{FeedParser, ParsedFeed};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, USER_AGENT};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio::time::timeout;
use tracing::debug;
use url::Url;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

pub fn default_user_agent() -> String {
    format!("NewsStation/{} (+https://github.com/your-username/news-station)", env!("CARGO_PKG_VERSION"))
}

/// Accept only absolute http(s) URLs.
pub fn validate_http_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url).map_err(|e| Error::InvalidUrl(format!("{}: {}", url, e)))?;

    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        scheme => Err(Error::InvalidUrl(format!("Unsupported scheme: {}", scheme))),
    }
}

/// Shared HTTP client used by every source adapter.
///
/// Every request is bounded by `timeout_duration`; non-2xx responses are
/// turned into [`Error::Http`] so adapters can treat all failures alike.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    timeout_duration: Duration,
    user_agent: String,
}

impl HttpClient {
    pub fn new(timeout_duration: Duration, user_agent: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout_duration)
            .redirect(reqwest::redirect::Policy::limited(10))
            .gzip(true)
            .build()
            .map_err(|e| Error::Http(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            timeout_duration,
            user_agent: user_agent.into(),
        })
    }

    pub fn with_defaults() -> Result<Self> {
        Self::new(DEFAULT_TIMEOUT, default_user_agent())
    }

    pub fn timeout(&self) -> Duration {
        self.timeout_duration
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    /// GET `url` and fail on transport errors, timeouts and non-success statuses.
    pub async fn get(&self, url: &str, accept: &str) -> Result<Response> {
        validate_http_url(url)?;
        debug!("GET {}", url);

        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&self.user_agent)
                .map_err(|e| Error::Invalid(format!("Bad user agent: {}", e)))?,
        );
        headers.insert(
            ACCEPT,
            HeaderValue::from_str(accept).map_err(|e| Error::Invalid(format!("Bad accept header: {}", e)))?,
        );

        let response = timeout(self.timeout_duration, self.client.get(url).headers(headers).send())
            .await
            .map_err(|_| Error::Timeout(format!("Request to {} timed out", url)))??;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Http(format!(
                "HTTP {} for {}: {}",
                status.as_u16(),
                url,
                status.canonical_reason().unwrap_or("Unknown error")
            )));
        }

        Ok(response)
    }

    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self.get(url, "application/json").await?;
        let bytes = timeout(self.timeout_duration, response.bytes())
            .await
            .map_err(|_| Error::Timeout(format!("Reading body of {} timed out", url)))??;

        serde_json::from_slice(&bytes).map_err(|e| Error::Parse(format!("Invalid JSON from {}: {}", url, e)))
    }

    pub async fn get_text(&self, url: &str) -> Result<String> {
        let response = self.get(url, "text/html, text/plain, */*").await?;
        let text = timeout(self.timeout_duration, response.text())
            .await
            .map_err(|_| Error::Timeout(format!("Reading body of {} timed out", url)))??;

        debug!("Downloaded {} bytes from {}", text.len(), url);
        Ok(text)
    }

    pub async fn fetch_feed(&self, url: &str) -> Result<ParsedFeed> {
        let response = self
            .get(url, "application/rss+xml, application/atom+xml, application/xml, text/xml, */*")
            .await?;
        let content = timeout(self.timeout_duration, response.bytes())
            .await
            .map_err(|_| Error::Timeout(format!("Reading body of {} timed out", url)))??;

        debug!("Downloaded {} bytes of feed from {}", content.len(), url);
        FeedParser::new().parse_feed(std::io::Cursor::new(content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const VALID_RSS_RESPONSE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
    <channel>
        <title>Test Feed</title>
        <link>https://example.com</link>
        <item>
            <title>Test Article</title>
            <link>https://example.com/article</link>
            <pubDate>Fri, 15 Mar 2024 10:00:00 GMT</pubDate>
        </item>
    </channel>
</rss>"#;

    #[derive(Debug, Deserialize)]
    struct Item {
        id: u64,
    }

    fn client() -> HttpClient {
        HttpClient::new(Duration::from_secs(5), "NewsStationTest/1.0").unwrap()
    }

    #[tokio::test]
    async fn test_get_json() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/item.json"))
            .and(header("user-agent", "NewsStationTest/1.0"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"id": 42}"#))
            .mount(&mock_server)
            .await;

        let item: Item = client()
            .get_json(&format!("{}/item.json", mock_server.uri()))
            .await
            .unwrap();
        assert_eq!(item.id, 42);
    }

    #[tokio::test]
    async fn test_get_json_malformed() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/broken.json"))
            .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
            .mount(&mock_server)
            .await;

        let result: Result<Item> = client().get_json(&format!("{}/broken.json", mock_server.uri())).await;
        assert!(matches!(result, Err(Error::Parse(_))));
    }

    #[tokio::test]
    async fn test_fetch_404_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/notfound"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let result = client().get_text(&format!("{}/notfound", mock_server.uri())).await;
        match result {
            Err(Error::Http(msg)) => assert!(msg.contains("404")),
            other => panic!("Expected Http error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_timeout() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/slow"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_delay(Duration::from_secs(5))
                    .set_body_string("late"),
            )
            .mount(&mock_server)
            .await;

        let client = HttpClient::new(Duration::from_millis(100), "NewsStationTest/1.0").unwrap();
        let result = client.get_text(&format!("{}/slow", mock_server.uri())).await;

        assert!(matches!(result, Err(Error::Timeout(_))));
        assert!(result.unwrap_err().is_temporary());
    }

    #[tokio::test]
    async fn test_fetch_feed() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/feed.xml"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(VALID_RSS_RESPONSE)
                    .insert_header("content-type", "application/rss+xml"),
            )
            .mount(&mock_server)
            .await;

        let feed = client()
            .fetch_feed(&format!("{}/feed.xml", mock_server.uri()))
            .await
            .unwrap();
        assert_eq!(feed.title, "Test Feed");
        assert_eq!(feed.entries.len(), 1);
    }

    #[tokio::test]
    async fn test_invalid_url_schemes() {
        let client = client();

        for url in ["ftp://example.com/feed.xml", "file:///local/feed.xml", "not-a-url"] {
            let result = client.get_text(url).await;
            assert!(matches!(result, Err(Error::InvalidUrl(_))), "expected InvalidUrl for {}", url);
        }
    }

    #[test]
    fn test_validate_http_url() {
        assert!(validate_http_url("https://example.com/feed.xml").is_ok());
        assert!(validate_http_url("http://127.0.0.1:8080/x?y=z").is_ok());
        assert!(validate_http_url("javascript:alert('xss')").is_err());
        assert!(validate_http_url("").is_err());
    }
}
