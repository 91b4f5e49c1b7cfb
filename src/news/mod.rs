// src/news/mod.rs
pub mod catalog;
pub mod mock;

use std::collections::HashSet;

use crate::error::FetchError;
use crate::model::NewsArticle;

pub use mock::MockNewsGenerator;

/// Anything that can hand out news for watchlist symbols.
///
/// Every call may suspend; none of them block a thread.
#[async_trait::async_trait]
pub trait NewsSource: Send + Sync {
    /// `count` articles about `symbol`. Blank symbol yields an empty list.
    async fn for_symbol(&self, symbol: &str, count: usize) -> Result<Vec<NewsArticle>, FetchError>;

    /// `per_symbol` articles for each symbol, newest first.
    async fn for_all_symbols(
        &self,
        symbols: &[String],
        per_symbol: usize,
    ) -> Result<Vec<NewsArticle>, FetchError>;

    /// Zero or more articles not already in `existing_ids`.
    async fn poll_for_new(
        &self,
        existing_ids: &HashSet<String>,
        symbols: &[String],
    ) -> Result<Vec<NewsArticle>, FetchError>;

    fn name(&self) -> &'static str;
}

/// Newest first. Stable, so equal timestamps keep insertion order.
pub fn sort_newest_first(articles: &mut [NewsArticle]) {
    articles.sort_by(|a, b| b.published_at.cmp(&a.published_at));
}

/// Put `fresh` in front of `existing`, dropping ids that are already present.
pub fn prepend_unique(fresh: Vec<NewsArticle>, existing: &[NewsArticle]) -> Vec<NewsArticle> {
    let mut seen: HashSet<String> = existing.iter().map(|a| a.id.clone()).collect();
    let mut out = Vec::with_capacity(fresh.len() + existing.len());
    for a in fresh {
        if seen.insert(a.id.clone()) {
            out.push(a);
        }
    }
    out.extend_from_slice(existing);
    out
}
