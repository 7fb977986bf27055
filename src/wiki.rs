//! Encyclopedia lookup against the Wikipedia Action API.

use std::collections::BTreeMap;

use async_trait::async_trait;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::http::{Identity, Outbound, OutboundError};
use crate::lang::Lang;

pub const NOT_FOUND_TITLE: &str = "No information found";
pub const NOT_FOUND_EXTRACT: &str = "Sorry, no information could be found for your request.";

/// Characters left unescaped in canonical article URLs: alphanumerics, `_.-~` and `/`.
const WIKI_PATH: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'_')
    .remove(b'.')
    .remove(b'-')
    .remove(b'~')
    .remove(b'/');

#[derive(Debug, thiserror::Error)]
pub enum WikiError {
    #[error("Wikipedia request failed: {0}")]
    Outbound(#[from] OutboundError),

    #[error("Wikipedia response unreadable: {0}")]
    Body(#[from] reqwest::Error),

    #[error("invalid Wikipedia endpoint: {0}")]
    Endpoint(#[from] url::ParseError),

    #[error("Wikipedia response is not JSON: {0}")]
    Malformed(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LookupResult {
    pub title: String,
    pub extract: String,
    pub source: String,
}

impl LookupResult {
    pub fn not_found() -> Self {
        Self {
            title: NOT_FOUND_TITLE.to_string(),
            extract: NOT_FOUND_EXTRACT.to_string(),
            source: String::new(),
        }
    }
}

#[async_trait]
pub trait Encyclopedia: Send + Sync {
    async fn lookup(&self, query: &str, lang: Lang) -> Result<LookupResult, WikiError>;
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    query: Option<QueryBody>,
}

#[derive(Debug, Deserialize)]
struct QueryBody {
    #[serde(default)]
    pages: BTreeMap<String, Page>,
}

#[derive(Debug, Deserialize)]
struct Page {
    title: Option<String>,
    extract: Option<String>,
    missing: Option<serde_json::Value>,
    invalid: Option<serde_json::Value>,
}

pub fn canonical_url(query: &str, lang: Lang) -> String {
    format!(
        "https://{}.wikipedia.org/wiki/{}",
        lang.code(),
        utf8_percent_encode(query, WIKI_PATH)
    )
}

#[derive(Clone)]
pub struct WikiClient {
    http: Outbound,
    endpoint: String,
}

impl WikiClient {
    /// `endpoint` contains a `{lang}` placeholder, e.g. `https://{lang}.wikipedia.org/w/api.php`.
    pub fn new(http: Outbound, endpoint: &str) -> Self {
        Self {
            http,
            endpoint: endpoint.to_string(),
        }
    }

    fn request_url(&self, query: &str, lang: Lang) -> Result<Url, WikiError> {
        let base = self.endpoint.replace("{lang}", lang.code());
        Ok(Url::parse_with_params(
            &base,
            &[
                ("action", "query"),
                ("prop", "extracts"),
                ("exintro", "1"),
                ("explaintext", "1"),
                ("titles", query),
                ("format", "json"),
            ],
        )?)
    }
}

#[async_trait]
impl Encyclopedia for WikiClient {
    async fn lookup(&self, query: &str, lang: Lang) -> Result<LookupResult, WikiError> {
        let url = self.request_url(query, lang)?;
        let body = self.http.get(&url, Identity::Service).await?.text().await?;
        let result = parse_lookup(&body, query, lang)?;
        debug!(%lang, found = !result.source.is_empty(), "wikipedia lookup complete");
        Ok(result)
    }
}

/// An empty body or a response without pages is a miss. A body that is not
/// JSON at all is an error, so an upstream outage is not reported as a miss.
fn parse_lookup(body: &str, query: &str, lang: Lang) -> Result<LookupResult, WikiError> {
    if body.trim().is_empty() {
        return Ok(LookupResult::not_found());
    }
    let response: QueryResponse = serde_json::from_str(body)?;

    Ok(response
        .query
        .and_then(|q| {
            q.pages
                .into_values()
                .find(|page| page.missing.is_none() && page.invalid.is_none())
        })
        .map(|page| LookupResult {
            title: page.title.unwrap_or_default(),
            extract: page.extract.unwrap_or_default(),
            source: canonical_url(query, lang),
        })
        .unwrap_or_else(LookupResult::not_found))
}


#[cfg(test)]
mod http_tests {
    use super::*;
    use crate::http::test_outbound;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> WikiClient {
        WikiClient::new(test_outbound(0), &format!("{}/{{lang}}/w/api.php", server.uri()))
    }

    #[tokio::test]
    async fn lookup_sends_exact_title_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/en/w/api.php"))
            .and(query_param("action", "query"))
            .and(query_param("prop", "extracts"))
            .and(query_param("titles", "Albert Einstein"))
            .and(query_param("format", "json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "query": {"pages": {"736": {
                    "title": "Albert Einstein",
                    "extract": "German-born theoretical physicist."
                }}}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let result = client(&server).lookup("Albert Einstein", Lang::En).await.unwrap();
        assert_eq!(result.title, "Albert Einstein");
        assert!(result.source.starts_with("https://en.wikipedia.org/wiki/"));
    }

    #[tokio::test]
    async fn lookup_uses_language_in_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/hi/w/api.php"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "query": {"pages": {"-1": {"title": "x", "missing": ""}}}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let result = client(&server).lookup("x", Lang::Hi).await.unwrap();
        assert_eq!(result, LookupResult::not_found());
    }

    #[tokio::test]
    async fn lookup_server_error_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let err = client(&server).lookup("x", Lang::En).await.unwrap_err();
        assert!(err.to_string().contains("502"), "got: {err}");
    }

    #[tokio::test]
    async fn html_error_page_is_reported_not_a_miss() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_body_string("<html><body>Service unavailable</body></html>"),
            )
            .mount(&server)
            .await;

        let err = client(&server).lookup("x", Lang::En).await.unwrap_err();
        assert!(err.to_string().contains("not JSON"), "got: {err}");
    }
}
