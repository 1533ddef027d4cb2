use crate::error::{Error, Result};
use regex::Regex;
use select::document::Document;
use select::node::Node;
use select::predicate::{Class, Name, Predicate};

/// Width used when falling back to whole-document text rendering.
const FALLBACK_WIDTH: usize = 100;

/// Pulls the readable body out of an article page.
///
/// Looks for the first matching container (`article`, `main`, common CMS
/// classes), joins its paragraphs and headings, and falls back to rendering
/// the whole document as text.
pub struct ContentExtractor {
    selectors: ContentSelectors,
    regex_patterns: RegexPatterns,
    min_length: usize,
}

#[derive(Debug, Clone)]
pub struct ContentSelectors {
    /// Candidate containers, in priority order. A leading `.` selects by class.
    pub containers: Vec<String>,
    /// Elements stripped before extraction.
    pub remove: Vec<String>,
}

#[derive(Debug)]
struct RegexPatterns {
    whitespace: Regex,
    multiple_newlines: Regex,
    removals: Vec<Regex>,
}

impl Default for ContentSelectors {
    fn default() -> Self {
        Self {
            containers: vec![
                "article".to_string(),
                "main".to_string(),
                ".post-content".to_string(),
                ".entry-content".to_string(),
                ".article-body".to_string(),
                ".content".to_string(),
            ],
            remove: vec![
                "script".to_string(),
                "style".to_string(),
                "noscript".to_string(),
                "nav".to_string(),
                "footer".to_string(),
                "header".to_string(),
                "aside".to_string(),
                "form".to_string(),
            ],
        }
    }
}

impl RegexPatterns {
    fn new(selectors: &ContentSelectors) -> Result<Self> {
        let removals = selectors
            .remove
            .iter()
            .map(|tag| {
                Regex::new(&format!(r"(?is)<{0}\b[^>]*>.*?</{0}>", regex::escape(tag)))
                    .map_err(|e| Error::ContentExtraction(e.to_string()))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            whitespace: Regex::new(r"\s+").map_err(|e| Error::ContentExtraction(e.to_string()))?,
            multiple_newlines: Regex::new(r"\n{3,}").map_err(|e| Error::ContentExtraction(e.to_string()))?,
            removals,
        })
    }
}

impl ContentExtractor {
    pub fn new() -> Result<Self> {
        Self::with_selectors(ContentSelectors::default())
    }

    pub fn with_selectors(selectors: ContentSelectors) -> Result<Self> {
        let regex_patterns = RegexPatterns::new(&selectors)?;
        Ok(Self {
            selectors,
            regex_patterns,
            min_length: 40,
        })
    }

    /// Extract readable text from an HTML page.
    pub fn extract_text(&self, html: &str) -> Result<String> {
        let cleaned = self.clean_html(html);
        let document = Document::from(cleaned.as_str());

        for selector in &self.selectors.containers {
            let container = match selector.strip_prefix('.') {
                Some(class) => document.find(Class(class)).next(),
                None => document.find(Name(selector.as_str())).next(),
            };

            if let Some(root) = container {
                let text = self.collect_blocks(&root);
                if text.len() >= self.min_length {
                    return Ok(text);
                }
            }
        }

        let paragraphs: Vec<String> = document
            .find(Name("p"))
            .map(|node| self.normalize(&node.text()))
            .filter(|text| !text.is_empty())
            .collect();
        if !paragraphs.is_empty() {
            return Ok(paragraphs.join("\n\n"));
        }

        let rendered = html2text::from_read(cleaned.as_bytes(), FALLBACK_WIDTH);
        let rendered = self
            .regex_patterns
            .multiple_newlines
            .replace_all(rendered.trim(), "\n\n")
            .to_string();

        if rendered.is_empty() {
            Err(Error::ContentExtraction("No readable content found".to_string()))
        } else {
            Ok(rendered)
        }
    }

    fn clean_html(&self, html: &str) -> String {
        self.regex_patterns
            .removals
            .iter()
            .fold(html.to_string(), |acc, pattern| pattern.replace_all(&acc, "").to_string())
    }

    fn collect_blocks(&self, root: &Node) -> String {
        let blocks = Name("p")
            .or(Name("h1"))
            .or(Name("h2"))
            .or(Name("h3"))
            .or(Name("pre"))
            .or(Name("blockquote"));

        root.find(blocks)
            .map(|node| self.normalize(&node.text()))
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    fn normalize(&self, text: &str) -> String {
        self.regex_patterns.whitespace.replace_all(text.trim(), " ").to_string()
    }
}
