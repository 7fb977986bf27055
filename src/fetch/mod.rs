//! Article retrieval: guarded download, charset decoding and readability extraction.

mod extractor;
mod ssrf;

use encoding_rs::{Encoding, UTF_8};
use reqwest::header::CONTENT_TYPE;
use tracing::debug;

use crate::http::{Identity, Outbound, OutboundError};
use extractor::extract_article;
use ssrf::{DnsResolver, HostGuard, TokioDnsResolver};

const MAX_RESPONSE_BYTES: usize = 10_000_000;

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("invalid URL: must be HTTP(S)")]
    InvalidScheme,

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("blocked: internal/private host not allowed")]
    InternalHost,

    #[error("fetch failed: {0}")]
    Outbound(#[from] OutboundError),

    #[error("fetch failed: {0}")]
    Body(#[from] reqwest::Error),

    #[error("DNS resolution failed: {0}")]
    DnsResolution(String),

    #[error("response too large (>{} bytes)", MAX_RESPONSE_BYTES)]
    TooLarge,

    #[error("no readable text in page")]
    NoContent,
}

#[derive(Debug, Clone)]
pub struct FetchedArticle {
    pub url: String,
    pub title: Option<String>,
    pub text: String,
}

pub struct ArticleFetcher<R = TokioDnsResolver> {
    http: Outbound,
    guard: HostGuard<R>,
}

impl ArticleFetcher {
    pub fn new(http: Outbound, allow_private_hosts: bool) -> Self {
        Self::with_guard(http, HostGuard::new(allow_private_hosts))
    }
}

impl<R: DnsResolver> ArticleFetcher<R> {
    pub fn with_guard(http: Outbound, guard: HostGuard<R>) -> Self {
        Self { http, guard }
    }

    pub async fn fetch(&self, url: &str) -> Result<FetchedArticle, FetchError> {
        self.guard.check(url).await?;

        let (final_url, html) = self.download(url).await?;

        // Redirects may land somewhere the original URL did not. reqwest has
        // already requested every hop by now; only the body is refused here.
        if final_url != url {
            self.guard.check(&final_url).await?;
        }

        let article = extract_article(&html, Some(&final_url));
        if article.text.is_empty() {
            return Err(FetchError::NoContent);
        }

        debug!(
            url = %ssrf::redact_credentials(&final_url),
            bytes = html.len(),
            raw_fallback = article.used_raw_fallback,
            "article fetched"
        );
        Ok(FetchedArticle {
            url: final_url,
            title: article.title,
            text: article.text,
        })
    }

    async fn download(&self, url: &str) -> Result<(String, String), FetchError> {
        let mut response = self.http.get_once(url, Identity::Browser).await?;
        let final_url = response.url().to_string();

        if let Some(len) = response.content_length()
            && len as usize > MAX_RESPONSE_BYTES
        {
            return Err(FetchError::TooLarge);
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            body.extend_from_slice(&chunk);
            if body.len() > MAX_RESPONSE_BYTES {
                return Err(FetchError::TooLarge);
            }
        }

        Ok((final_url, decode_body(&body, content_type.as_deref())))
    }
}

/// Decode with the declared charset; a BOM wins, unknown labels fall back to UTF-8.
fn decode_body(body: &[u8], content_type: Option<&str>) -> String {
    let encoding = content_type
        .and_then(charset_label)
        .and_then(|label| Encoding::for_label(label.as_bytes()))
        .unwrap_or(UTF_8);
    let (text, _, _) = encoding.decode(body);
    text.into_owned()
}

fn charset_label(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"'))
    })
}


#[cfg(test)]
mod download_tests {
    use std::net::IpAddr;

    use super::*;
    use crate::http::{MAX_REDIRECTS, test_outbound, test_outbound_resolving};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ARTICLE_HTML: &str = r#"
        <html><head><title>Harbour reopens</title></head>
        <body><article>
            <h1>Harbour reopens after storm repairs</h1>
            <p>The harbour reopened to commercial traffic on Monday after three weeks of repairs
            to the breakwater that was damaged during the autumn storms along the coast.</p>
            <p>Port officials said the first container ships were expected by midweek, and that
            fishing boats had already returned to their usual berths near the old market.</p>
            <p>Engineers will continue monitoring the structure through the winter months and
            a full report on the cost of the repairs is due to be published early next year.</p>
        </article></body></html>"#;

    fn fetcher() -> ArticleFetcher {
        ArticleFetcher::new(test_outbound(0), true)
    }

    #[tokio::test]
    async fn fetch_extracts_body_text() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/story"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html; charset=utf-8")
                    .set_body_string(ARTICLE_HTML),
            )
            .mount(&server)
            .await;

        let article = fetcher()
            .fetch(&format!("{}/story", server.uri()))
            .await
            .unwrap();

        assert!(article.text.contains("harbour reopened to commercial traffic"));
        assert!(article.url.ends_with("/story"));
    }

    #[tokio::test]
    async fn fetch_404_is_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/gone"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let result = fetcher().fetch(&format!("{}/gone", server.uri())).await;
        assert!(matches!(
            result,
            Err(FetchError::Outbound(OutboundError::Status(404)))
        ));
    }

    #[tokio::test]
    async fn fetch_rejects_oversized_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/huge"))
            .respond_with(ResponseTemplate::new(200).set_body_string("x".repeat(MAX_RESPONSE_BYTES + 1)))
            .mount(&server)
            .await;

        let result = fetcher().fetch(&format!("{}/huge", server.uri())).await;
        assert!(matches!(result, Err(FetchError::TooLarge)));
    }

    #[tokio::test]
    async fn fetch_page_without_text_is_no_content() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/empty"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html><body></body></html>"))
            .mount(&server)
            .await;

        let result = fetcher().fetch(&format!("{}/empty", server.uri())).await;
        assert!(matches!(result, Err(FetchError::NoContent)));
    }

    #[tokio::test]
    async fn strict_fetcher_blocks_loopback() {
        let strict = ArticleFetcher::new(test_outbound(0), false);
        let result = strict.fetch("http://127.0.0.1/secret").await;
        assert!(matches!(result, Err(FetchError::InternalHost)));
    }

    struct PublicDns;

    impl DnsResolver for PublicDns {
        async fn lookup(&self, _host: &str, _port: u16) -> Result<Vec<IpAddr>, FetchError> {
            Ok(vec!["93.184.216.34".parse().unwrap()])
        }
    }

    #[tokio::test]
    async fn redirect_to_private_host_is_blocked() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/start"))
            .respond_with(
                ResponseTemplate::new(302)
                    .insert_header("location", format!("{}/internal", server.uri()).as_str()),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/internal"))
            .respond_with(ResponseTemplate::new(200).set_body_string(ARTICLE_HTML))
            .mount(&server)
            .await;

        let addr = *server.address();
        let strict = ArticleFetcher::with_guard(
            test_outbound_resolving("news.example", addr),
            HostGuard::with_resolver(PublicDns, false),
        );
        let result = strict
            .fetch(&format!("http://news.example:{}/start", addr.port()))
            .await;
        assert!(matches!(result, Err(FetchError::InternalHost)), "{result:?}");
    }

    #[tokio::test]
    async fn redirect_loop_stops_at_limit() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/loop"))
            .respond_with(ResponseTemplate::new(302).insert_header("location", "/loop"))
            .mount(&server)
            .await;

        let result = fetcher().fetch(&format!("{}/loop", server.uri())).await;
        assert!(
            matches!(&result, Err(FetchError::Outbound(OutboundError::Network(e))) if e.is_redirect()),
            "{result:?}"
        );

        let hits = server.received_requests().await.unwrap().len();
        assert!(
            (MAX_REDIRECTS..=MAX_REDIRECTS + 1).contains(&hits),
            "followed {hits} hops"
        );
    }
}
