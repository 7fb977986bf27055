//! News aggregation: the first few feed entries, each enriched with the
//! scraped article body. Article failures degrade the item, never the batch.

pub mod feed;

use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::fetch::{ArticleFetcher, FetchError};
use crate::http::OutboundError;
use crate::lang::Lang;
use feed::{FeedEntry, FeedReader};

pub const MAX_NEWS_ITEMS: usize = 2;
pub const FULL_TEXT_UNAVAILABLE: &str = "Could not fetch full content.";

#[derive(Debug, thiserror::Error)]
pub enum NewsError {
    #[error("news feed request failed: {0}")]
    Outbound(#[from] OutboundError),

    #[error("news feed unreadable: {0}")]
    Body(#[from] reqwest::Error),

    #[error("news feed could not be parsed: {0}")]
    Parse(String),

    #[error("invalid news endpoint: {0}")]
    Endpoint(#[from] url::ParseError),

    #[error("news feed did not answer before the deadline")]
    Timeout,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewsItem {
    pub title: String,
    pub link: String,
    pub published: String,
    pub summary: String,
    pub full_text: String,
}

#[async_trait]
pub trait NewsSource: Send + Sync {
    /// Items are returned by `deadline`. Articles still loading then are
    /// replaced by the placeholder; only a late feed fails the call.
    async fn aggregate(
        &self,
        query: &str,
        lang: Lang,
        deadline: Instant,
    ) -> Result<Vec<NewsItem>, NewsError>;
}

pub struct NewsAggregator {
    feed: FeedReader,
    articles: ArticleFetcher,
    article_timeout: Duration,
}

impl NewsAggregator {
    pub fn new(feed: FeedReader, articles: ArticleFetcher, article_timeout: Duration) -> Self {
        Self {
            feed,
            articles,
            article_timeout,
        }
    }

    async fn enrich(&self, entry: FeedEntry, deadline: Instant) -> NewsItem {
        let budget = self
            .article_timeout
            .min(deadline.saturating_duration_since(Instant::now()));
        let outcome = tokio::time::timeout(budget, self.articles.fetch(&entry.link))
            .await
            .map_err(|_| format!("timed out after {:.1}s", budget.as_secs_f32()))
            .and_then(|r| r.map_err(|e: FetchError| e.to_string()));

        match outcome {
            Ok(article) => {
                if article.url != entry.link {
                    debug!(link = %entry.link, resolved = %article.url, "article redirected");
                }
                NewsItem {
                    title: article.title.unwrap_or(entry.title),
                    link: entry.link,
                    published: entry.published,
                    summary: entry.summary,
                    full_text: article.text,
                }
            }
            Err(reason) => {
                warn!(link = %entry.link, %reason, "article fetch failed, keeping feed entry");
                degraded(entry)
            }
        }
    }
}

fn degraded(entry: FeedEntry) -> NewsItem {
    NewsItem {
        title: entry.title,
        link: entry.link,
        published: entry.published,
        summary: entry.summary,
        full_text: FULL_TEXT_UNAVAILABLE.to_string(),
    }
}

#[async_trait]
impl NewsSource for NewsAggregator {
    async fn aggregate(
        &self,
        query: &str,
        lang: Lang,
        deadline: Instant,
    ) -> Result<Vec<NewsItem>, NewsError> {
        let mut entries = tokio::time::timeout_at(deadline, self.feed.search(query, lang))
            .await
            .map_err(|_| NewsError::Timeout)??;
        let available = entries.len();
        entries.truncate(MAX_NEWS_ITEMS);

        // join_all keeps input order, so items stay in feed order.
        let items = join_all(
            entries
                .into_iter()
                .map(|entry| self.enrich(entry, deadline)),
        )
        .await;

        let placeholders = items
            .iter()
            .filter(|i| i.full_text == FULL_TEXT_UNAVAILABLE)
            .count();
        debug!(%lang, available, items = items.len(), placeholders, "news aggregation complete");
        Ok(items)
    }
}
