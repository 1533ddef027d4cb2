pub mod extractor;

pub use extractor::{ContentExtractor, ContentSelectors};
