//! Runtime configuration for the pipeline.
//!
//! Everything a component needs is gathered into a [`Settings`] value built
//! once from the parsed [`Cli`](crate::cli::Cli) and handed to each
//! constructor. Nothing here reads ambient process state after start-up, so
//! tests can build settings from fixtures.
//!
//! # Category table
//!
//! Categories are weighted topic buckets. The built-in table can be replaced
//! with a YAML file shaped like:
//!
//! ```yaml
//! fallback: ai
//! categories:
//!   - id: ai
//!     name: "AI/인공지능"
//!     weight: 0.7
//!     keywords: ["AI", "인공지능", "ChatGPT"]
//! ```

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, instrument};

use crate::cli::Cli;

/// Fatal configuration problems, raised when a component is constructed.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A credential the component cannot run without is absent or blank.
    #[error("missing required setting {0}")]
    MissingCredential(&'static str),

    /// The category table could not be read.
    #[error("failed to read category file {path}: {source}")]
    CategoryFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The category table is not valid YAML for [`CategoryTable`].
    #[error("invalid category file: {0}")]
    CategoryYaml(#[from] serde_yaml::Error),

    /// The table is structurally unusable (empty, bad fallback, ...).
    #[error("invalid category table: {0}")]
    InvalidCategories(String),

    /// A locale string was not of the form `ll-CC`.
    #[error("invalid locale {0:?}, expected something like ko-KR")]
    InvalidLocale(String),
}

/// A weighted topic bucket with the keywords used to search for it.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Category {
    /// Stable identifier used on the command line (`ai`, `tech`, ...).
    pub id: String,
    /// Human-readable name substituted into prompts.
    pub name: String,
    /// Search keywords, most important first.
    pub keywords: Vec<String>,
    /// Relative selection weight. Need not be normalized.
    pub weight: f64,
}

impl Category {
    fn new(id: &str, name: &str, keywords: &[&str], weight: f64) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            weight,
        }
    }
}

/// Ordered set of categories plus the id to fall back on when a search
/// comes back empty.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CategoryTable {
    pub fallback: String,
    pub categories: Vec<Category>,
}

impl Default for CategoryTable {
    fn default() -> Self {
        Self {
            fallback: "ai".to_string(),
            categories: vec![
                Category::new(
                    "ai",
                    "AI/인공지능",
                    &[
                        "AI", "인공지능", "ChatGPT", "GPT", "LLM", "머신러닝", "딥러닝", "OpenAI",
                        "Gemini", "Claude",
                    ],
                    0.7,
                ),
                Category::new(
                    "tech",
                    "테크 리뷰",
                    &["스마트폰", "애플", "삼성", "구글", "테크", "가젯", "앱", "소프트웨어"],
                    0.15,
                ),
                Category::new(
                    "economy",
                    "시사/경제",
                    &["경제", "주식", "투자", "금리", "환율", "부동산", "스타트업"],
                    0.15,
                ),
            ],
        }
    }
}

impl CategoryTable {
    /// Parse and validate a table from YAML text.
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let table: CategoryTable = serde_yaml::from_str(text)?;
        table.validate()?;
        Ok(table)
    }

    /// Load a table from a YAML file on disk.
    #[instrument(level = "info", skip_all, fields(path = %path.display()))]
    pub fn from_yaml_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::CategoryFile {
            path: path.display().to_string(),
            source,
        })?;
        let table = Self::from_yaml(&text)?;
        info!(count = table.categories.len(), "Loaded category table");
        Ok(table)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.categories.is_empty() {
            return Err(ConfigError::InvalidCategories("no categories".into()));
        }
        if self.get(&self.fallback).is_none() {
            return Err(ConfigError::InvalidCategories(format!(
                "fallback {:?} is not a configured category",
                self.fallback
            )));
        }
        if let Some(id) = self.ids().duplicates().next() {
            return Err(ConfigError::InvalidCategories(format!(
                "category {id:?} is defined twice"
            )));
        }
        if let Some(c) = self.categories.iter().find(|c| c.keywords.is_empty()) {
            return Err(ConfigError::InvalidCategories(format!(
                "category {:?} has no keywords",
                c.id
            )));
        }
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(|c| c.id.as_str())
    }
}

/// A feed locale, e.g. `ko-KR`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct Locale {
    /// Interface language (`hl`), e.g. `ko`.
    pub language: String,
    /// Edition country (`gl`), e.g. `KR`.
    pub country: String,
}

impl Locale {
    pub fn new(language: &str, country: &str) -> Self {
        Self {
            language: language.to_string(),
            country: country.to_string(),
        }
    }

    /// Parse `ko-KR` / `en_US` style tags.
    pub fn parse(tag: &str) -> Result<Self, ConfigError> {
        let mut parts = tag.trim().split(['-', '_']);
        match (parts.next(), parts.next(), parts.next()) {
            (Some(lang), Some(country), None) if !lang.is_empty() && !country.is_empty() => {
                Ok(Self::new(&lang.to_lowercase(), &country.to_uppercase()))
            }
            _ => Err(ConfigError::InvalidLocale(tag.to_string())),
        }
    }

    /// The two editions searched when the caller does not ask for others.
    pub fn defaults() -> Vec<Locale> {
        vec![Locale::new("ko", "KR"), Locale::new("en", "US")]
    }
}

impl std::fmt::Display for Locale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.language, self.country)
    }
}

/// Generative-service settings.
#[derive(Debug, Clone)]
pub struct GeminiSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub max_output_tokens: u32,
}

/// Mail relay and notification settings.
#[derive(Debug, Clone)]
pub struct MailSettings {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub address: Option<String>,
    pub app_password: Option<String>,
    pub recipient: Option<String>,
    /// Tistory blog name used for the "write a new post" link.
    pub blog_name: Option<String>,
    /// Include a generated illustrative-image URL in the HTML mail.
    pub include_thumbnail: bool,
}

/// Everything the pipeline needs, resolved once at start-up.
#[derive(Debug, Clone)]
pub struct Settings {
    pub data_dir: PathBuf,
    pub categories: CategoryTable,
    pub locales: Vec<Locale>,
    pub gemini: GeminiSettings,
    pub mail: MailSettings,
}

impl Settings {
    /// Resolve settings from parsed command-line/environment arguments.
    pub fn from_cli(cli: &Cli) -> Result<Self, ConfigError> {
        let categories = match &cli.categories {
            Some(path) => CategoryTable::from_yaml_file(Path::new(path))?,
            None => CategoryTable::default(),
        };
        let locales = if cli.locales.is_empty() {
            Locale::defaults()
        } else {
            cli.locales
                .iter()
                .map(|l| Locale::parse(l))
                .collect::<Result<Vec<_>, _>>()?
        };

        Ok(Self {
            data_dir: PathBuf::from(&cli.data_dir),
            categories,
            locales,
            gemini: GeminiSettings {
                api_key: non_blank(&cli.gemini_api_key),
                model: cli.gemini_model.clone(),
                max_output_tokens: 8192,
            },
            mail: MailSettings {
                smtp_host: cli.smtp_host.clone(),
                smtp_port: cli.smtp_port,
                address: non_blank(&cli.gmail_address),
                app_password: non_blank(&cli.gmail_app_password),
                recipient: non_blank(&cli.notify_email),
                blog_name: non_blank(&cli.blog_name),
                include_thumbnail: cli.thumbnail_url,
            },
        })
    }

    pub fn articles_dir(&self) -> PathBuf {
        self.data_dir.join("articles")
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.data_dir.join("cache")
    }

    pub fn thumbnails_dir(&self) -> PathBuf {
        self.data_dir.join("thumbnails")
    }
}

/// Treat empty or whitespace-only values the same as unset ones.
pub fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Return the value or the named [`ConfigError::MissingCredential`].
pub fn require(value: &Option<String>, name: &'static str) -> Result<String, ConfigError> {
    non_blank(value).ok_or(ConfigError::MissingCredential(name))
}
