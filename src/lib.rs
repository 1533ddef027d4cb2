pub mod aggregator;
pub mod cli;
pub mod config;
pub mod content;
pub mod error;
pub mod feed;
pub mod sources;
pub mod storage;

pub use aggregator::NewsAggregator;
pub use config::Config;
pub use error::{Error, Result};
pub use feed::{Article, Author, CategorySummary, Feed, Source};
pub use sources::{NewsSource, SourceRegistry};
