//! Google News RSS search feed.

use quick_xml::de::from_str;
use serde::Deserialize;
use url::Url;

use crate::http::{Identity, Outbound};
use crate::lang::Lang;

use super::NewsError;

/// One `<item>` as the feed provides it; nothing is parsed or normalised.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
pub struct FeedEntry {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link: String,
    #[serde(rename = "pubDate", default)]
    pub published: String,
    #[serde(rename = "description", default)]
    pub summary: String,
}

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<FeedEntry>,
}

#[derive(Clone)]
pub struct FeedReader {
    http: Outbound,
    endpoint: String,
}

impl FeedReader {
    pub fn new(http: Outbound, endpoint: &str) -> Self {
        Self {
            http,
            endpoint: endpoint.to_string(),
        }
    }

    pub(super) fn search_url(&self, query: &str, lang: Lang) -> Result<Url, NewsError> {
        let locale = lang.news_locale();
        Ok(Url::parse_with_params(
            &self.endpoint,
            &[
                ("q", query),
                ("hl", locale.hl),
                ("gl", locale.gl),
                ("ceid", locale.ceid),
            ],
        )?)
    }

    pub async fn search(&self, query: &str, lang: Lang) -> Result<Vec<FeedEntry>, NewsError> {
        let url = self.search_url(query, lang)?;
        let body = self.http.get(&url, Identity::Service).await?.text().await?;
        parse_feed(&body)
    }
}

pub(super) fn parse_feed(xml: &str) -> Result<Vec<FeedEntry>, NewsError> {
    let rss: Rss = from_str(xml).map_err(|e| NewsError::Parse(e.to_string()))?;
    Ok(rss.channel.items)
}
