use std::sync::Arc;

use tracing::debug;

use crate::aggregator::NewsAggregator;
use crate::feed::{split_article_id, Article};

impl NewsAggregator {
    /// Look an article up by id.
    ///
    /// Checks the article cache first unless `force_refresh` is set, then asks
    /// the owning source for its latest articles and scans them for the id.
    pub async fn get_article(&self, article_id: &str, force_refresh: bool) -> Option<Arc<Article>> {
        if !force_refresh {
            if let Some(article) = self.caches.articles.get(article_id) {
                return Some(article);
            }
        }

        let Some((token, _)) = split_article_id(article_id) else {
            debug!("Malformed article id '{}'", article_id);
            return None;
        };

        let Some(adapter) = self.registry.resolve(token) else {
            debug!("No source owns article id '{}'", article_id);
            return None;
        };

        let found = adapter
            .fetch_articles(self.lookup_limit)
            .await
            .into_iter()
            .find(|article| article.id == article_id);

        match found {
            Some(article) => Some(self.caches.articles.insert(article.id.clone(), article)),
            None => {
                debug!("Article '{}' not found in the latest {} from '{}'", article_id, self.lookup_limit, adapter.id());
                None
            }
        }
    }

    /// Full body of an article, fetched by its owning source.
    pub async fn get_article_content(&self, article_id: &str) -> Option<String> {
        let article = self.get_article(article_id, false).await?;
        let (token, _) = split_article_id(article_id)?;
        let adapter = self.registry.resolve(token)?;

        adapter.fetch_content(&article.url).await
    }
}
