//! Fan-out of one question to the three sources, merged into a single answer.

use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;
use tracing::{info, warn};

use crate::config::Config;
use crate::directory::{DirectoryClient, DirectoryHit, ProfileSearch};
use crate::fetch::ArticleFetcher;
use crate::http::Outbound;
use crate::lang::Lang;
use crate::news::feed::FeedReader;
use crate::news::{NewsAggregator, NewsItem, NewsSource};
use crate::wiki::{Encyclopedia, LookupResult, WikiClient};

/// Slack past the news deadline before the aggregation itself is abandoned.
const DEADLINE_GRACE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WikipediaAnswer {
    pub title: String,
    pub answer: String,
    pub source: String,
}

impl From<LookupResult> for WikipediaAnswer {
    fn from(r: LookupResult) -> Self {
        Self {
            title: r.title,
            answer: r.extract,
            source: r.source,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ComposedAnswer {
    pub status: &'static str,
    pub query: String,
    pub wikipedia: WikipediaAnswer,
    pub google_news: Vec<NewsItem>,
    pub linkedin_results: Vec<DirectoryHit>,
    pub wikipedia_error: Option<String>,
    pub google_news_error: Option<String>,
    pub linkedin_error: Option<String>,
}

pub struct Composer {
    encyclopedia: Arc<dyn Encyclopedia>,
    news: Arc<dyn NewsSource>,
    directory: Arc<dyn ProfileSearch>,
    source_timeout: Duration,
}

impl Composer {
    pub fn new(
        encyclopedia: Arc<dyn Encyclopedia>,
        news: Arc<dyn NewsSource>,
        directory: Arc<dyn ProfileSearch>,
        source_timeout: Duration,
    ) -> Self {
        Self {
            encyclopedia,
            news,
            directory,
            source_timeout,
        }
    }

    /// Wire the real clients from configuration, sharing one outbound client.
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        let http = Outbound::new(&config.outbound())?;

        let wiki = WikiClient::new(http.clone(), &config.wiki_endpoint);
        let news = NewsAggregator::new(
            FeedReader::new(http.clone(), &config.news_endpoint),
            ArticleFetcher::new(http.clone(), config.allow_private_hosts),
            config.article_timeout(),
        );
        let directory = DirectoryClient::new(http, &config.directory_endpoint);

        Ok(Self::new(
            Arc::new(wiki),
            Arc::new(news),
            Arc::new(directory),
            config.source_timeout(),
        ))
    }

    /// Never fails: a source that errors or overruns its budget contributes its
    /// empty value and a message in the matching `*_error` field.
    pub async fn compose(
        &self,
        question: &str,
        person_name: Option<&str>,
        lang: Lang,
    ) -> ComposedAnswer {
        let name = person_name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(question);

        let budget = self.source_timeout;
        let deadline = Instant::now() + budget;

        // News honours the deadline itself so finished feed items survive a
        // slow article; the outer timeout only catches a source that ignores it.
        let (wiki, news, profiles) = tokio::join!(
            isolate("wikipedia", budget, self.encyclopedia.lookup(question, lang)),
            isolate(
                "google_news",
                budget + DEADLINE_GRACE,
                self.news.aggregate(question, lang, deadline),
            ),
            isolate("linkedin", budget, self.directory.find_profiles(name, lang)),
        );

        let (wikipedia, wikipedia_error) = split(wiki, LookupResult::not_found);
        let (google_news, google_news_error) = split(news, Vec::new);
        let (linkedin_results, linkedin_error) = split(profiles, Vec::new);

        let failed_sources = [&wikipedia_error, &google_news_error, &linkedin_error]
            .iter()
            .filter(|e| e.is_some())
            .count();
        info!(
            %lang,
            news = google_news.len(),
            profiles = linkedin_results.len(),
            failed_sources,
            "answer composed"
        );

        ComposedAnswer {
            status: "success",
            query: question.to_string(),
            wikipedia: wikipedia.into(),
            google_news,
            linkedin_results,
            wikipedia_error,
            google_news_error,
            linkedin_error,
        }
    }

}

async fn isolate<T, E, F>(source: &'static str, budget: Duration, call: F) -> Result<T, String>
where
    F: Future<Output = Result<T, E>>,
    E: Display,
{
    match tokio::time::timeout(budget, call).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => {
            warn!(source, error = %e, "source failed");
            Err(e.to_string())
        }
        Err(_) => {
            warn!(source, timeout_secs = budget.as_secs_f32(), "source timed out");
            Err(format!("{source} timed out after {}s", budget.as_secs_f32()))
        }
    }
}

fn split<T>(outcome: Result<T, String>, fallback: impl FnOnce() -> T) -> (T, Option<String>) {
    match outcome {
        Ok(value) => (value, None),
        Err(message) => (fallback(), Some(message)),
    }
}
