//! Thumbnail prompts and downloads via the Pollinations image service.
//!
//! Korean title words and tags are mapped to English keywords, combined with
//! a per-category style and a fixed house style, and encoded into an image
//! URL. The URL alone is enough to embed in an email; [`Thumbnailer`] also
//! downloads the image to disk.
//!
//! # URL Pattern
//!
//! ```text
//! https://image.pollinations.ai/prompt/{encoded prompt}?width=1024&height=1024&nologo=true
//! ```

use reqwest::Client;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info, instrument};

use crate::config::CategoryTable;

const BASE_URL: &str = "https://image.pollinations.ai/prompt";
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);

const STYLE_PROMPT: &str = "minimalist, modern, clean design, trendy, professional, \
soft gradient background, subtle lighting, high quality, \
blog thumbnail style, no text, no watermark";

const DEFAULT_KEYWORDS: [&str; 3] = ["technology", "digital", "innovation"];
const DEFAULT_STYLE: &str = "modern, professional";

const MAX_TITLE_KEYWORDS: usize = 2;
const MAX_TAGS: usize = 3;
const MAX_KEYWORDS: usize = 4;

/// Korean (and a few ASCII) terms to English image keywords, in match order.
const KEYWORD_MAP: &[(&str, &str)] = &[
    ("인공지능", "artificial intelligence"),
    ("AI", "AI technology"),
    ("챗봇", "chatbot"),
    ("로봇", "robot"),
    ("자동화", "automation"),
    ("머신러닝", "machine learning"),
    ("딥러닝", "deep learning"),
    ("테크", "technology"),
    ("스타트업", "startup"),
    ("앱", "mobile app"),
    ("클라우드", "cloud computing"),
    ("데이터", "data analytics"),
    ("보안", "cybersecurity"),
    ("블록체인", "blockchain"),
    ("메타버스", "metaverse"),
    ("VR", "virtual reality"),
    ("AR", "augmented reality"),
    ("건강", "health wellness"),
    ("다이어트", "diet fitness"),
    ("운동", "exercise workout"),
    ("영양제", "supplements vitamins"),
    ("경제", "economy finance"),
    ("주식", "stock market"),
    ("부동산", "real estate"),
    ("투자", "investment"),
    ("생활", "lifestyle"),
    ("인테리어", "interior design"),
    ("요리", "cooking food"),
    ("맛집", "restaurant food"),
    ("레시피", "recipe cooking"),
];

const CATEGORY_STYLES: &[(&str, &str)] = &[
    ("ai", "futuristic, neural network visualization, blue and purple tones"),
    ("tech", "modern gadgets, sleek design, tech aesthetic"),
    ("economy", "business, finance, growth charts, professional"),
    ("startup", "innovation, entrepreneurship, modern office"),
];

#[derive(Debug, Error)]
pub enum ThumbnailError {
    #[error("thumbnail request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("thumbnail service returned status {0}")]
    Status(u16),

    #[error("failed to write thumbnail to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn lookup(key: &str) -> Option<&'static str> {
    KEYWORD_MAP.iter().find(|(k, _)| *k == key).map(|(_, v)| *v)
}

/// English keywords for a title and its tags.
///
/// Up to two come from the title, then the first three tags are mapped
/// (ASCII tags are kept as they are), capped at four overall.
pub fn english_keywords(title: &str, tags: &[String]) -> Vec<String> {
    let mut keywords: Vec<String> = KEYWORD_MAP
        .iter()
        .filter(|(kor, _)| title.contains(*kor))
        .take(MAX_TITLE_KEYWORDS)
        .map(|(_, eng)| eng.to_string())
        .collect();

    for tag in tags.iter().take(MAX_TAGS) {
        if keywords.len() >= MAX_KEYWORDS {
            break;
        }
        let candidate = if let Some(eng) = lookup(&tag.to_lowercase()) {
            Some(eng.to_string())
        } else if tag.is_ascii() {
            Some(tag.clone())
        } else {
            KEYWORD_MAP
                .iter()
                .find(|(kor, eng)| tag.contains(*kor) && !keywords.iter().any(|k| k == eng))
                .map(|(_, eng)| eng.to_string())
        };
        if let Some(candidate) = candidate {
            if !keywords.contains(&candidate) {
                keywords.push(candidate);
            }
        }
    }

    if keywords.is_empty() {
        return DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect();
    }
    keywords.truncate(MAX_KEYWORDS);
    keywords
}

/// Style key for an article's stored category label.
///
/// Drafts carry the display name (`AI/인공지능`), styles are keyed by id
/// (`ai`). Labels that match no configured name are used as they are.
pub fn category_key<'a>(categories: &'a CategoryTable, label: &'a str) -> &'a str {
    categories
        .categories
        .iter()
        .find(|c| c.name == label)
        .map_or(label, |c| c.id.as_str())
}

/// Full image prompt: keywords, category style, house style.
pub fn build_prompt(title: &str, tags: &[String], category: &str) -> String {
    let category = category.to_lowercase();
    let style = CATEGORY_STYLES
        .iter()
        .find(|(id, _)| *id == category)
        .map_or(DEFAULT_STYLE, |(_, style)| *style);
    format!(
        "{}, {style}, {STYLE_PROMPT}",
        english_keywords(title, tags).join(", ")
    )
}

/// Image URL for a title, tags and category id.
pub fn image_url(title: &str, tags: &[String], category: &str) -> String {
    let prompt = build_prompt(title, tags, category);
    format!(
        "{BASE_URL}/{}?width=1024&height=1024&nologo=true",
        urlencoding::encode(&prompt)
    )
}

/// Downloads thumbnails to disk.
#[derive(Debug, Clone, Default)]
pub struct Thumbnailer {
    client: Client,
}

impl Thumbnailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch the image for `title`/`tags`/`category` and write it to
    /// `dir/file_name`. Returns the written path.
    #[instrument(level = "info", skip(self, tags, dir))]
    pub async fn download(
        &self,
        title: &str,
        tags: &[String],
        category: &str,
        dir: &Path,
        file_name: &str,
    ) -> Result<PathBuf, ThumbnailError> {
        let url = image_url(title, tags, category);
        debug!(%url, "Requesting thumbnail");

        let response = self
            .client
            .get(&url)
            .timeout(DOWNLOAD_TIMEOUT)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(ThumbnailError::Status(response.status().as_u16()));
        }
        let bytes = response.bytes().await?;

        let path = dir.join(file_name);
        fs::create_dir_all(dir).await.map_err(|source| ThumbnailError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
        fs::write(&path, &bytes)
            .await
            .map_err(|source| ThumbnailError::Io {
                path: path.clone(),
                source,
            })?;

        info!(path = %path.display(), bytes = bytes.len(), "Saved thumbnail");
        Ok(path)
    }
}
