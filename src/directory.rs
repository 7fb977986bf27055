//! LinkedIn profile search through DuckDuckGo's HTML endpoint.
//!
//! Result links are kept exactly as the page provides them, redirect
//! wrappers included.

use async_trait::async_trait;
use scraper::{Html, Selector};
use serde::Serialize;
use tracing::{debug, trace};
use url::Url;

use crate::http::{Identity, Outbound, OutboundError};
use crate::lang::Lang;

pub const MAX_PROFILE_HITS: usize = 3;

const PROFILE_SITE: &str = "site:linkedin.com/in";

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("directory search failed: {0}")]
    Outbound(#[from] OutboundError),

    #[error("directory response unreadable: {0}")]
    Body(#[from] reqwest::Error),

    #[error("directory page could not be parsed: {0}")]
    Parse(String),

    #[error("invalid directory endpoint: {0}")]
    Endpoint(#[from] url::ParseError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectoryHit {
    pub title: String,
    pub url: String,
}

#[async_trait]
pub trait ProfileSearch: Send + Sync {
    async fn find_profiles(&self, name: &str, lang: Lang)
    -> Result<Vec<DirectoryHit>, DirectoryError>;
}

pub struct DirectoryClient {
    http: Outbound,
    endpoint: String,
}

impl DirectoryClient {
    pub fn new(http: Outbound, endpoint: &str) -> Self {
        Self {
            http,
            endpoint: endpoint.to_string(),
        }
    }

    fn search_url(&self, name: &str, lang: Lang) -> Result<Url, DirectoryError> {
        let q = format!("{name} {PROFILE_SITE}");
        Ok(Url::parse_with_params(
            &self.endpoint,
            &[("q", q.as_str()), ("kl", lang.search_region())],
        )?)
    }
}

#[async_trait]
impl ProfileSearch for DirectoryClient {
    async fn find_profiles(
        &self,
        name: &str,
        lang: Lang,
    ) -> Result<Vec<DirectoryHit>, DirectoryError> {
        let url = self.search_url(name, lang)?;
        trace!(%url, "directory search");

        // The HTML endpoint serves an empty shell to non-browser agents.
        let html = self.http.get(&url, Identity::Browser).await?.text().await?;
        let hits = parse_results(&html)?;

        debug!(%lang, hits = hits.len(), "directory search complete");
        Ok(hits)
    }
}

pub(crate) fn parse_results(html: &str) -> Result<Vec<DirectoryHit>, DirectoryError> {
    let document = Html::parse_document(html);
    let anchor = Selector::parse("a.result__a")
        .map_err(|e| DirectoryError::Parse(format!("invalid result selector: {e:?}")))?;

    Ok(document
        .select(&anchor)
        .take(MAX_PROFILE_HITS)
        .map(|a| DirectoryHit {
            title: a.text().collect::<String>().trim().to_string(),
            url: a.value().attr("href").unwrap_or_default().to_string(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESULTS_HTML: &str = r#"<!DOCTYPE html>
<html><body>
<div class="result results_links web-result">
  <a class="result__a" href="//duckduckgo.com/l/?uddg=https%3A%2F%2Fwww.linkedin.com%2Fin%2Fjane&amp;rut=a1">
     Jane Doe - Engineer - Acme | LinkedIn
  </a>
</div>
<div class="result results_links web-result">
  <a class="result__a" href="https://www.linkedin.com/in/jane-doe-2">Jane Doe - Lecturer</a>
</div>
<div class="result results_links web-result">
  <a class="result__a">Jane Doe (no link)</a>
</div>
<div class="result results_links web-result">
  <a class="result__a" href="https://www.linkedin.com/in/jane-doe-4">Jane Doe - Fourth</a>
</div>
<a class="result__url" href="https://ignored.example">not a title anchor</a>
</body></html>"#;

    #[test]
    fn takes_first_three_anchors_verbatim() {
        let hits = parse_results(RESULTS_HTML).unwrap();
        assert_eq!(hits.len(), MAX_PROFILE_HITS);

        assert_eq!(hits[0].title, "Jane Doe - Engineer - Acme | LinkedIn");
        assert_eq!(
            hits[0].url,
            "//duckduckgo.com/l/?uddg=https%3A%2F%2Fwww.linkedin.com%2Fin%2Fjane&rut=a1"
        );
        assert_eq!(hits[1].url, "https://www.linkedin.com/in/jane-doe-2");
        assert_eq!(hits[2].title, "Jane Doe (no link)");
        assert_eq!(hits[2].url, "");
    }

    #[test]
    fn page_without_results_is_empty() {
        let hits = parse_results("<html><body><p>No results.</p></body></html>").unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn search_url_restricts_to_profiles_and_sets_region() {
        let client = DirectoryClient::new(
            crate::http::test_outbound(0),
            "https://html.duckduckgo.com/html/",
        );
        let url = client.search_url("Jane Doe", Lang::Es).unwrap();
        assert_eq!(
            url.as_str(),
            "https://html.duckduckgo.com/html/?q=Jane+Doe+site%3Alinkedin.com%2Fin&kl=es-es"
        );
    }
}
