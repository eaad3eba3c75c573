//! Google News RSS search feed.
//!
//! Queries `https://news.google.com/rss/search` for one locale at a time and
//! turns the RSS 2.0 channel into [`FeedEntry`] values. Only the first
//! [`MAX_ENTRIES_PER_FEED`] items of each response are kept.
//!
//! # URL Pattern
//!
//! ```text
//! https://news.google.com/rss/search?q=AI+OR+LLM&hl=ko&gl=KR&ceid=KR:ko
//! ```

use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, instrument};
use url::Url;

use super::{NewsError, NewsFeed};
use crate::config::Locale;
use crate::models::FeedEntry;

const SEARCH_URL: &str = "https://news.google.com/rss/search";

/// Items kept from a single feed response.
pub const MAX_ENTRIES_PER_FEED: usize = 10;

/// Google News RSS search client.
#[derive(Debug, Clone)]
pub struct GoogleNewsFeed {
    client: Client,
}

impl Default for GoogleNewsFeed {
    fn default() -> Self {
        Self::new()
    }
}

impl GoogleNewsFeed {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }
}

/// Build the search URL for a query and locale.
pub fn search_url(query: &str, locale: &Locale) -> Result<Url, url::ParseError> {
    let ceid = format!("{}:{}", locale.country, locale.language);
    Url::parse_with_params(
        SEARCH_URL,
        &[
            ("q", query),
            ("hl", locale.language.as_str()),
            ("gl", locale.country.as_str()),
            ("ceid", ceid.as_str()),
        ],
    )
}

impl NewsFeed for GoogleNewsFeed {
    #[instrument(level = "info", skip(self, locale), fields(%locale))]
    async fn search(&self, query: &str, locale: &Locale) -> Result<Vec<FeedEntry>, NewsError> {
        let url = search_url(query, locale)?;
        debug!(%url, "Fetching news feed");

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(NewsError::Status(response.status().as_u16()));
        }
        let body = response.text().await?;
        let entries = parse_feed(&body, locale)?;

        info!(count = entries.len(), "Fetched news feed");
        Ok(entries)
    }
}

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<Item>,
}

#[derive(Debug, Deserialize)]
struct Item {
    #[serde(default)]
    title: String,
    #[serde(default)]
    link: String,
    #[serde(rename = "pubDate", default)]
    pub_date: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    source: Option<ItemSource>,
}

#[derive(Debug, Deserialize)]
struct ItemSource {
    #[serde(rename = "$text", default)]
    name: String,
}

/// Parse an RSS 2.0 document into at most [`MAX_ENTRIES_PER_FEED`] entries.
pub fn parse_feed(xml: &str, locale: &Locale) -> Result<Vec<FeedEntry>, NewsError> {
    let rss: Rss = quick_xml::de::from_str(xml)?;
    Ok(rss
        .channel
        .items
        .into_iter()
        .take(MAX_ENTRIES_PER_FEED)
        .map(|item| FeedEntry {
            title: item.title.trim().to_string(),
            link: item.link.trim().to_string(),
            published: item.pub_date,
            summary: item.description,
            source: item
                .source
                .map(|s| s.name.trim().to_string())
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| "Unknown".to_string()),
            locale: locale.clone(),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<rss xmlns:media="http://search.yahoo.com/mrss/" version="2.0">
  <channel>
    <generator>NFE/5.0</generator>
    <title>"AI OR LLM" - Google 뉴스</title>
    <link>https://news.google.com/search?q=AI&amp;hl=ko</link>
    <language>ko</language>
    <description>Google 뉴스</description>
    <item>
      <title>AI 모델 X 출시 - 연합뉴스</title>
      <link>https://news.google.com/rss/articles/abc?oc=5</link>
      <guid isPermaLink="false">abc</guid>
      <pubDate>Sat, 17 Oct 2026 01:00:00 GMT</pubDate>
      <description>&lt;a href="https://example.com"&gt;AI 모델 X 출시&lt;/a&gt;</description>
      <source url="https://www.yna.co.kr">연합뉴스</source>
    </item>
    <item>
      <title>Chips &amp; models</title>
      <link>https://news.google.com/rss/articles/def?oc=5</link>
      <pubDate>Sat, 17 Oct 2026 02:00:00 GMT</pubDate>
    </item>
  </channel>
</rss>"#;

    #[test]
    fn test_parse_feed() {
        let locale = Locale::new("ko", "KR");
        let entries = parse_feed(FEED, &locale).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].title, "AI 모델 X 출시 - 연합뉴스");
        assert_eq!(entries[0].source, "연합뉴스");
        assert_eq!(entries[0].link, "https://news.google.com/rss/articles/abc?oc=5");
        assert!(entries[0].summary.contains("<a href="));
        assert_eq!(entries[1].title, "Chips & models");
        assert_eq!(entries[1].source, "Unknown");
        assert_eq!(entries[1].locale, locale);
    }

    #[test]
    fn test_parse_feed_caps_entries() {
        let items: String = (0..15)
            .map(|i| format!("<item><title>t{i}</title><link>https://x/{i}</link></item>"))
            .collect();
        let xml = format!("<rss version=\"2.0\"><channel><title>x</title>{items}</channel></rss>");
        let entries = parse_feed(&xml, &Locale::new("en", "US")).unwrap();
        assert_eq!(entries.len(), MAX_ENTRIES_PER_FEED);
        assert_eq!(entries[9].title, "t9");
    }

    #[test]
    fn test_parse_empty_channel() {
        let xml = "<rss version=\"2.0\"><channel><title>x</title></channel></rss>";
        assert!(parse_feed(xml, &Locale::new("en", "US")).unwrap().is_empty());
    }

    #[test]
    fn test_search_url() {
        let url = search_url("AI OR 인공지능", &Locale::new("ko", "KR")).unwrap();
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(url.host_str(), Some("news.google.com"));
        assert_eq!(url.path(), "/rss/search");
        assert!(pairs.contains(&("q".into(), "AI OR 인공지능".into())));
        assert!(pairs.contains(&("hl".into(), "ko".into())));
        assert!(pairs.contains(&("gl".into(), "KR".into())));
        assert!(pairs.contains(&("ceid".into(), "KR:ko".into())));
    }
}
