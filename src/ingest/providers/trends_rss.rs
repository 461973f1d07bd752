// src/ingest/providers/trends_rss.rs
use anyhow::{Context, Result};
use async_trait::async_trait;
use quick_xml::de::from_str;
use serde::Deserialize;
use std::collections::HashSet;

use crate::ingest::normalize_keyword;
use crate::ingest::types::Fetcher;
use crate::model::RawTrend;

pub const DEFAULT_FEED_BASE: &str = "https://trends.google.com/trending/rss";

#[cfg(feature = "fetch-http")]
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    #[serde(rename = "ht:approx_traffic", alias = "approx_traffic")]
    approx_traffic: Option<String>,
}

/// Trending-searches RSS feed, one `RawTrend` per `<item>`.
pub struct TrendsRssFetcher {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    #[cfg(feature = "fetch-http")]
    Http { url: String, client: reqwest::Client },
}

impl TrendsRssFetcher {
    pub fn from_fixture(xml: &str) -> Self {
        Self {
            mode: Mode::Fixture(xml.to_string()),
        }
    }

    #[cfg(feature = "fetch-http")]
    pub fn from_url(url: impl Into<String>) -> Result<Self> {
        // reqwest picks up HTTPS_PROXY / HTTP_PROXY from the environment.
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .context("building trends http client")?;
        Ok(Self {
            mode: Mode::Http {
                url: url.into(),
                client,
            },
        })
    }

    #[cfg(feature = "fetch-http")]
    pub fn for_geo(geo: &str) -> Result<Self> {
        Self::from_url(feed_url(geo))
    }

    fn parse_items_from_str(s: &str) -> Result<Vec<RawTrend>> {
        let xml_clean = scrub_html_entities_for_xml(s);
        let rss: Rss = from_str(&xml_clean).context("parsing trends rss xml")?;
        Ok(dedup_rows(rss.channel.item))
    }
}

pub fn feed_url(geo: &str) -> String {
    format!("{DEFAULT_FEED_BASE}?geo={}", geo.trim().to_ascii_uppercase())
}

/// Drop empty titles and exact keyword repeats (first occurrence wins).
fn dedup_rows(items: Vec<Item>) -> Vec<RawTrend> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(items.len());
    for it in items {
        let Some(title) = it.title else { continue };
        let key = normalize_keyword(&title);
        if key.is_empty() || !seen.insert(key) {
            continue;
        }
        out.push(RawTrend {
            keyword: title.trim().to_string(),
            traffic: it.approx_traffic.map(|t| t.trim().to_string()),
        });
    }
    out
}

#[async_trait]
impl Fetcher for TrendsRssFetcher {
    async fn fetch(&self) -> Result<Vec<RawTrend>> {
        match &self.mode {
            Mode::Fixture(s) => Self::parse_items_from_str(s),

            #[cfg(feature = "fetch-http")]
            Mode::Http { url, client } => {
                let resp = client
                    .get(url.as_str())
                    .send()
                    .await
                    .context("trends http get()")?;
                let body = resp
                    .error_for_status()
                    .context("trends http status")?
                    .text()
                    .await
                    .context("trends http .text()")?;
                Self::parse_items_from_str(&body)
            }
        }
    }

    fn name(&self) -> &'static str {
        "trends-rss"
    }
}

fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}
