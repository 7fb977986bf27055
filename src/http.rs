//! Shared outbound HTTP client: one place for timeouts, identity, retries and
//! the global in-flight limit.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::Duration;

use reqwest::header::USER_AGENT;
use reqwest::{Client, ClientBuilder, Response, StatusCode};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::debug;
use url::Url;

/// Maximum redirect hops before aborting.
pub const MAX_REDIRECTS: usize = 5;
const INITIAL_BACKOFF_MS: u64 = 200;

#[derive(Debug, Clone)]
pub struct OutboundConfig {
    pub timeout: Duration,
    pub connect_timeout: Duration,
    pub user_agent: String,
    pub max_retries: u32,
    pub max_concurrency: usize,
}

impl Default for OutboundConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(15),
            connect_timeout: Duration::from_secs(5),
            user_agent: "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36".into(),
            max_retries: 2,
            max_concurrency: 32,
        }
    }
}

/// How a request identifies itself upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Identity {
    /// `sift/<version>`, for APIs that ask clients to identify themselves.
    Service,
    /// The configured browser User-Agent, for surfaces that block bots.
    Browser,
}

#[derive(Debug, thiserror::Error)]
pub enum OutboundError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("upstream returned status {0}")]
    Status(u16),

    #[error("outbound limiter closed")]
    Closed,
}

/// A response that keeps its concurrency permit until the body has been read
/// or the transfer is dropped.
pub struct Transfer {
    response: Response,
    _permit: OwnedSemaphorePermit,
}

impl Transfer {
    pub async fn text(self) -> Result<String, reqwest::Error> {
        self.response.text().await
    }
}

impl Deref for Transfer {
    type Target = Response;

    fn deref(&self) -> &Response {
        &self.response
    }
}

impl DerefMut for Transfer {
    fn deref_mut(&mut self) -> &mut Response {
        &mut self.response
    }
}

#[derive(Clone)]
pub struct Outbound {
    client: Client,
    permits: Arc<Semaphore>,
    max_retries: u32,
    browser_user_agent: String,
}

impl Outbound {
    pub fn new(config: &OutboundConfig) -> Result<Self, reqwest::Error> {
        Self::build(Client::builder(), config)
    }

    fn build(builder: ClientBuilder, config: &OutboundConfig) -> Result<Self, reqwest::Error> {
        let client = builder
            .connect_timeout(config.connect_timeout)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()?;
        Ok(Self {
            client,
            permits: Arc::new(Semaphore::new(config.max_concurrency.max(1))),
            max_retries: config.max_retries,
            browser_user_agent: config.user_agent.clone(),
        })
    }

    fn user_agent(&self, identity: Identity) -> &str {
        match identity {
            Identity::Service => crate::USER_AGENT,
            Identity::Browser => &self.browser_user_agent,
        }
    }

    /// Single GET attempt. Non-2xx statuses are returned as errors.
    pub async fn get_once(&self, url: &str, identity: Identity) -> Result<Transfer, OutboundError> {
        let permit = self
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| OutboundError::Closed)?;
        let response = self
            .client
            .get(url)
            .header(USER_AGENT, self.user_agent(identity))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(OutboundError::Status(status.as_u16()));
        }
        Ok(Transfer {
            response,
            _permit: permit,
        })
    }

    /// GET with retries on transient failures.
    pub async fn get(&self, url: &Url, identity: Identity) -> Result<Transfer, OutboundError> {
        let mut attempt = 0;
        loop {
            match self.get_once(url.as_str(), identity).await {
                Ok(response) => return Ok(response),
                Err(e) if is_retriable(&e) && attempt < self.max_retries => {
                    let delay_ms = jittered_backoff(attempt);
                    debug!(
                        host = url.host_str().unwrap_or_default(),
                        attempt = attempt + 1,
                        delay_ms,
                        error = %e,
                        "retrying after transient error"
                    );
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn is_retriable(e: &OutboundError) -> bool {
    match e {
        OutboundError::Status(code) => {
            *code == StatusCode::TOO_MANY_REQUESTS.as_u16() || (500..=599).contains(code)
        }
        OutboundError::Network(err) => err.is_connect() || err.is_timeout(),
        OutboundError::Closed => false,
    }
}

/// Equal jitter backoff: base/2 + rand(0, base/2).
fn jittered_backoff(attempt: u32) -> u64 {
    let base = INITIAL_BACKOFF_MS * 2u64.pow(attempt);
    let half = base / 2;
    half + fastrand::u64(..half.max(1))
}

#[cfg(test)]
pub(crate) fn test_outbound(max_retries: u32) -> Outbound {
    Outbound::new(&OutboundConfig {
        max_retries,
        ..OutboundConfig::default()
    })
    .unwrap()
}

/// Like [`test_outbound`], but `host` resolves to `addr` regardless of DNS.
#[cfg(test)]
pub(crate) fn test_outbound_resolving(host: &str, addr: std::net::SocketAddr) -> Outbound {
    Outbound::build(
        Client::builder().resolve(host, addr),
        &OutboundConfig {
            max_retries: 0,
            ..OutboundConfig::default()
        },
    )
    .unwrap()
}
