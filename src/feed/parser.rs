use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use feed_rs::parser as feed_parser;
use std::io::BufRead;

#[derive(Debug, Clone)]
pub struct ParsedFeed {
    pub title: String,
    pub description: Option<String>,
    pub link: Option<String>,
    pub last_build_date: Option<DateTime<Utc>>,
    pub entries: Vec<ParsedEntry>,
}

#[derive(Debug, Clone)]
pub struct ParsedEntry {
    pub title: String,
    pub link: String,
    pub description: Option<String>,
    pub content: Option<String>,
    pub author: Option<String>,
    pub published: Option<DateTime<Utc>>,
    pub updated: Option<DateTime<Utc>>,
    pub categories: Vec<String>,
}

/// RSS 0.9x/1.0/2.0, Atom and JSON Feed parsing on top of `feed-rs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeedParser;

impl FeedParser {
    pub fn new() -> Self {
        Self
    }

    pub fn parse_feed<R: BufRead>(&self, reader: R) -> Result<ParsedFeed> {
        let feed = feed_parser::parse(reader)
            .map_err(|e| Error::Parse(format!("Failed to parse feed: {}", e)))?;

        let title = feed.title.map(|t| t.content).unwrap_or_else(|| "Untitled Feed".to_string());
        let description = feed.description.map(|d| d.content);
        let link = feed.links.first().map(|l| l.href.clone());
        let last_build_date = feed.updated.or(feed.published);

        let entries = feed
            .entries
            .into_iter()
            .filter_map(|entry| {
                // Entries without a link cannot be addressed or routed back.
                let link = entry.links.first().map(|l| l.href.clone())?;
                let title = entry.title.map(|t| t.content).unwrap_or_else(|| "Untitled".to_string());

                Some(ParsedEntry {
                    title,
                    link,
                    description: entry.summary.map(|s| s.content),
                    content: entry.content.and_then(|c| c.body),
                    author: entry.authors.first().map(|a| a.name.clone()),
                    published: entry.published,
                    updated: entry.updated,
                    categories: entry.categories.into_iter().map(|c| c.term).collect(),
                })
            })
            .collect();

        Ok(ParsedFeed {
            title,
            description,
            link,
            last_build_date,
            entries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const RSS_SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0">
    <channel>
        <title>Test RSS Feed</title>
        <description>A test RSS feed for unit testing</description>
        <link>https://example.com</link>
        <lastBuildDate>Wed, 15 Mar 2024 10:00:00 GMT</lastBuildDate>
        <item>
            <title>First Article</title>
            <link>https://example.com/first</link>
            <description>This is the first test article</description>
            <author>test@example.com (Test Author)</author>
            <pubDate>Wed, 15 Mar 2024 09:00:00 GMT</pubDate>
            <guid>https://example.com/first</guid>
            <category>test</category>
            <category>sample</category>
        </item>
        <item>
            <title>Second Article</title>
            <link>https://example.com/second</link>
            <description>This is the second test article</description>
            <pubDate>Wed, 15 Mar 2024 08:00:00 GMT</pubDate>
            <guid>unique-guid-123</guid>
        </item>
        <item>
            <title>No link here</title>
            <description>Dropped because it has no link</description>
        </item>
    </channel>
</rss>"#;

    const ATOM_SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
    <title>Test Atom Feed</title>
    <subtitle>A test Atom feed for unit testing</subtitle>
    <link href="https://example.com"/>
    <updated>2024-03-15T10:00:00Z</updated>
    <id>https://example.com/feed</id>
    <entry>
        <title>Atom Article One</title>
        <link href="https://example.com/atom1"/>
        <id>https://example.com/atom1</id>
        <updated>2024-03-15T09:30:00Z</updated>
        <published>2024-03-15T09:00:00Z</published>
        <summary>Summary of the first atom article</summary>
        <content type="html">&lt;p&gt;Full content of the first atom article&lt;/p&gt;</content>
        <author>
            <name>Atom Author</name>
            <email>atom@example.com</email>
        </author>
        <category term="atom"/>
        <category term="test"/>
    </entry>
</feed>"#;

    #[test]
    fn test_parse_rss_feed() {
        let parser = FeedParser::new();
        let result = parser.parse_feed(Cursor::new(RSS_SAMPLE.as_bytes())).unwrap();

        assert_eq!(result.title, "Test RSS Feed");
        assert_eq!(result.description, Some("A test RSS feed for unit testing".to_string()));
        assert_eq!(result.entries.len(), 2);

        let first = &result.entries[0];
        assert_eq!(first.title, "First Article");
        assert_eq!(first.link, "https://example.com/first");
        assert_eq!(first.categories, vec!["test", "sample"]);
        assert!(first.published.is_some());
    }

    #[test]
    fn test_parse_atom_feed() {
        let parser = FeedParser::new();
        let result = parser.parse_feed(Cursor::new(ATOM_SAMPLE.as_bytes())).unwrap();

        assert_eq!(result.title, "Test Atom Feed");
        assert_eq!(result.entries.len(), 1);

        let entry = &result.entries[0];
        assert_eq!(entry.title, "Atom Article One");
        assert_eq!(entry.link, "https://example.com/atom1");
        assert_eq!(entry.content, Some("<p>Full content of the first atom article</p>".to_string()));
        assert_eq!(entry.author, Some("Atom Author".to_string()));
        assert!(entry.updated > entry.published);
    }

    #[test]
    fn test_parse_garbage_is_error() {
        let parser = FeedParser::new();
        let result = parser.parse_feed(Cursor::new("this is not a feed".as_bytes()));

        match result {
            Err(Error::Parse(msg)) => assert!(msg.contains("Failed to parse feed")),
            other => panic!("Expected Parse error, got {:?}", other.map(|f| f.title)),
        }
    }

    #[test]
    fn test_feed_with_missing_titles() {
        let parser = FeedParser::new();
        let no_title_feed = r#"<?xml version="1.0"?>
<rss version="2.0">
    <channel>
        <item>
            <link>https://example.com/notitle</link>
            <description>Article without title</description>
        </item>
    </channel>
</rss>"#;

        let result = parser.parse_feed(Cursor::new(no_title_feed.as_bytes())).unwrap();

        assert_eq!(result.title, "Untitled Feed");
        assert_eq!(result.entries.len(), 1);
        assert_eq!(result.entries[0].title, "Untitled");
    }
}
