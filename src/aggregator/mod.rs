pub mod engine;
pub mod resolver;

pub use engine::{
    merge_and_paginate, merge_articles, page_start, page_window, validate_pagination, NewsAggregator, DEFAULT_LOOKUP_LIMIT,
    MAX_PAGE_LIMIT,
};
