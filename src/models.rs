//! Data models for collected headlines and generated articles.
//!
//! This module defines the core data structures used throughout the application:
//! - [`FeedEntry`]: one item from a news search feed
//! - [`HeadlineItem`]: a deduplicated headline handed to the synthesizer
//! - [`NewsBundle`]: a main article plus a few related ones
//! - [`ArticleDraft`]: the model-generated blog post with pipeline provenance
//! - [`CacheEntry`]: a same-day cached draft
//!
//! Field names use snake_case both in Rust and on the wire; the prompt
//! templates ask the model for exactly these keys.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::config::Locale;

/// A single item returned by a news search feed.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedEntry {
    pub title: String,
    pub link: String,
    pub published: String,
    pub summary: String,
    /// Publication name, `"Unknown"` when the feed omits it.
    pub source: String,
    pub locale: Locale,
}

/// A headline as seen by the synthesizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadlineItem {
    pub title: String,
    pub source: String,
    pub locale: String,
}

impl From<&FeedEntry> for HeadlineItem {
    fn from(entry: &FeedEntry) -> Self {
        Self {
            title: entry.title.clone(),
            source: entry.source.clone(),
            locale: entry.locale.to_string(),
        }
    }
}

/// One lead article and up to three related ones for a category.
#[derive(Debug, Clone)]
pub struct NewsBundle {
    pub category: String,
    pub category_name: String,
    pub main_article: FeedEntry,
    pub related_articles: Vec<FeedEntry>,
    pub collected_at: String,
}

impl NewsBundle {
    /// Main article first, then related ones.
    pub fn headlines(&self) -> Vec<HeadlineItem> {
        std::iter::once(&self.main_article)
            .chain(self.related_articles.iter())
            .map(HeadlineItem::from)
            .collect()
    }
}

/// Which pipeline produced an article.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArticleKind {
    /// Information-style post built from news headlines.
    Info,
    /// Experience-style post built from a user memo.
    Experience,
}

impl ArticleKind {
    pub fn label(&self) -> &'static str {
        match self {
            ArticleKind::Info => "정보형 글",
            ArticleKind::Experience => "체험형 글",
        }
    }
}

/// A generated blog post.
///
/// The first block of fields comes from the model; the rest is provenance
/// added by the pipeline. Once saved, a draft is never modified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArticleDraft {
    pub title: String,
    #[serde(default)]
    pub meta_description: String,
    /// HTML body.
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Category label inferred by the model.
    #[serde(default)]
    pub category: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trend_summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reader_perspective: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_topic: Option<String>,
    /// Number of photos an experience post asks the author to prepare.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_count"
    )]
    pub photo_count: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub article_type: Option<ArticleKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_topic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_news: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_memo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl ArticleDraft {
    /// A draft with only the two fields every recovered article must have.
    pub fn new(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            meta_description: String::new(),
            content: content.into(),
            tags: Vec::new(),
            category: String::new(),
            trend_summary: None,
            reader_perspective: None,
            selected_topic: None,
            photo_count: None,
            article_type: None,
            source_topic: None,
            source_news: None,
            user_memo: None,
            created_at: None,
            id: None,
        }
    }
}

/// Models sometimes quote numbers; accept `3`, `"3"` or `null`.
fn lenient_count<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
        Some(serde_json::Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// A draft cached for the rest of the calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub cached_date: NaiveDate,
    pub cached_at: String,
    pub article: ArticleDraft,
}
