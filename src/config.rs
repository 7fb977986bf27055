use std::time::Duration;

use clap::Parser;

use crate::http::OutboundConfig;

pub const DEFAULT_WIKI_ENDPOINT: &str = "https://{lang}.wikipedia.org/w/api.php";
pub const DEFAULT_NEWS_ENDPOINT: &str = "https://news.google.com/rss/search";
pub const DEFAULT_DIRECTORY_ENDPOINT: &str = "https://html.duckduckgo.com/html/";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Runtime configuration. Every flag can also be set through its environment variable.
#[derive(Parser, Debug, Clone)]
#[command(name = "sift", version, about)]
pub struct Config {
    /// Address the HTTP server binds to
    #[arg(long, env = "SIFT_BIND", default_value = "127.0.0.1:8000")]
    pub bind: String,

    /// sqlx connection string for the user store
    #[arg(long, env = "DATABASE_URL", default_value = "sqlite://sift.db?mode=rwc")]
    pub database_url: String,

    #[arg(long, env = "SIFT_DB_MAX_CONNECTIONS", default_value_t = 5)]
    pub db_max_connections: u32,

    /// Whole-request timeout for a single outbound HTTP call, in seconds
    #[arg(long, env = "SIFT_HTTP_TIMEOUT_SECS", default_value_t = 15)]
    pub http_timeout_secs: u64,

    #[arg(long, env = "SIFT_CONNECT_TIMEOUT_SECS", default_value_t = 5)]
    pub connect_timeout_secs: u64,

    /// Browser-like User-Agent sent to sources that reject non-browser clients
    #[arg(
        long,
        env = "SIFT_BROWSER_USER_AGENT",
        default_value = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/123.0.0.0 Safari/537.36"
    )]
    pub browser_user_agent: String,

    /// Retries for transient outbound failures (429, 5xx, connect errors)
    #[arg(long, env = "SIFT_MAX_RETRIES", default_value_t = 2)]
    pub max_retries: u32,

    /// Upper bound on in-flight outbound requests across all handlers
    #[arg(long, env = "SIFT_MAX_CONCURRENCY", default_value_t = 32)]
    pub max_concurrency: usize,

    /// Budget for each of the three sources in /ask, in seconds
    #[arg(long, env = "SIFT_SOURCE_TIMEOUT_SECS", default_value_t = 20)]
    pub source_timeout_secs: u64,

    /// Budget for each scraped news article, in seconds
    #[arg(long, env = "SIFT_ARTICLE_TIMEOUT_SECS", default_value_t = 10)]
    pub article_timeout_secs: u64,

    /// Wikipedia Action API endpoint; `{lang}` is replaced by the language code
    #[arg(long, env = "SIFT_WIKI_ENDPOINT", default_value = DEFAULT_WIKI_ENDPOINT)]
    pub wiki_endpoint: String,

    #[arg(long, env = "SIFT_NEWS_ENDPOINT", default_value = DEFAULT_NEWS_ENDPOINT)]
    pub news_endpoint: String,

    #[arg(long, env = "SIFT_DIRECTORY_ENDPOINT", default_value = DEFAULT_DIRECTORY_ENDPOINT)]
    pub directory_endpoint: String,

    /// Allow article fetches to loopback/private addresses (testing only)
    #[arg(long, env = "SIFT_ALLOW_PRIVATE_HOSTS", default_value_t = false)]
    pub allow_private_hosts: bool,
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.http_timeout_secs == 0 || self.connect_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "HTTP timeouts must be greater than 0".into(),
            ));
        }
        if self.source_timeout_secs == 0 || self.article_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "source and article timeouts must be greater than 0".into(),
            ));
        }
        if self.max_concurrency == 0 {
            return Err(ConfigError::Invalid(
                "max_concurrency must be greater than 0".into(),
            ));
        }
        if self.db_max_connections == 0 {
            return Err(ConfigError::Invalid(
                "db_max_connections must be greater than 0".into(),
            ));
        }
        if !self.wiki_endpoint.contains("{lang}") {
            return Err(ConfigError::Invalid(
                "wiki_endpoint must contain a {lang} placeholder".into(),
            ));
        }
        Ok(())
    }

    pub fn outbound(&self) -> OutboundConfig {
        OutboundConfig {
            timeout: Duration::from_secs(self.http_timeout_secs),
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            user_agent: self.browser_user_agent.clone(),
            max_retries: self.max_retries,
            max_concurrency: self.max_concurrency,
        }
    }

    pub fn source_timeout(&self) -> Duration {
        Duration::from_secs(self.source_timeout_secs)
    }

    pub fn article_timeout(&self) -> Duration {
        Duration::from_secs(self.article_timeout_secs)
    }
}
