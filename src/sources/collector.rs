//! Headline collection across categories and locales.
//!
//! [`NewsCollector::collect`] picks a category, builds a keyword query, runs
//! one feed search per locale and merges the results. Two shapes are
//! available:
//!
//! - [`CollectForm::Bundle`]: one main article plus up to three related
//!   ones, deduplicated by link. The query is a random sample of at most
//!   three keywords.
//! - [`CollectForm::Titles`]: a flat list of [`HeadlineItem`]s,
//!   deduplicated by title text. The query is the first five keywords.
//!
//! When every search comes back empty the collector retries once with the
//! table's fallback category and then reports [`CollectOutcome::NoArticles`].

use chrono::Local;
use itertools::Itertools;
use rand::Rng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use rand::seq::IndexedRandom;
use tracing::{debug, info, instrument, warn};

use super::{NewsError, NewsFeed};
use crate::config::{Category, CategoryTable, Locale};
use crate::models::{FeedEntry, HeadlineItem, NewsBundle};

const BUNDLE_QUERY_KEYWORDS: usize = 3;
const TITLES_QUERY_KEYWORDS: usize = 5;
const RELATED_ARTICLES: usize = 3;

/// Which shape [`NewsCollector::collect`] returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectForm {
    Bundle,
    Titles,
}

/// Result of a collection request.
#[derive(Debug, Clone)]
pub enum CollectOutcome {
    Bundle(NewsBundle),
    Titles {
        category: String,
        category_name: String,
        titles: Vec<HeadlineItem>,
    },
    /// Nothing found, even after the fallback category.
    NoArticles { category: String, error: String },
}

/// Collects headlines from a [`NewsFeed`].
pub struct NewsCollector<F> {
    feed: F,
    categories: CategoryTable,
    locales: Vec<Locale>,
}

impl<F: NewsFeed> NewsCollector<F> {
    pub fn new(feed: F, categories: CategoryTable, locales: Vec<Locale>) -> Self {
        Self {
            feed,
            categories,
            locales,
        }
    }

    pub fn categories(&self) -> &CategoryTable {
        &self.categories
    }

    /// Draw one category with probability proportional to its weight.
    ///
    /// Negative weights count as zero. Fails when no weight is positive.
    pub fn select_category<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<&Category, NewsError> {
        let weights = self.categories.categories.iter().map(|c| c.weight.max(0.0));
        let index = WeightedIndex::new(weights)
            .map_err(|e| NewsError::InvalidConfig(format!("category weights: {e}")))?;
        let category = &self.categories.categories[index.sample(rng)];
        debug!(category = %category.id, "Selected category");
        Ok(category)
    }

    /// Collect headlines for `category` (or a weighted-random one).
    ///
    /// `locales` defaults to the collector's configured locales.
    #[instrument(level = "info", skip(self, locales, rng))]
    pub async fn collect<R: Rng + ?Sized>(
        &self,
        category: Option<&str>,
        locales: Option<&[Locale]>,
        form: CollectForm,
        rng: &mut R,
    ) -> Result<CollectOutcome, NewsError> {
        let mut category = match category {
            Some(id) => self
                .categories
                .get(id)
                .ok_or_else(|| NewsError::UnknownCategory(id.to_string()))?,
            None => self.select_category(rng)?,
        };
        let locales = locales.unwrap_or(&self.locales);

        let mut entries = self.fetch_all(category, locales, form, rng).await?;
        if entries.is_empty() && category.id != self.categories.fallback {
            let fallback = self
                .categories
                .get(&self.categories.fallback)
                .ok_or_else(|| NewsError::UnknownCategory(self.categories.fallback.clone()))?;
            warn!(
                category = %category.id,
                fallback = %fallback.id,
                "No articles found; retrying with fallback category"
            );
            category = fallback;
            entries = self.fetch_all(category, locales, form, rng).await?;
        }

        if entries.is_empty() {
            warn!(category = %category.id, "No articles found");
            return Ok(CollectOutcome::NoArticles {
                category: category.id.clone(),
                error: "No articles found".to_string(),
            });
        }

        info!(category = %category.id, count = entries.len(), "Collected articles");
        Ok(shape(category, entries, form))
    }

    async fn fetch_all<R: Rng + ?Sized>(
        &self,
        category: &Category,
        locales: &[Locale],
        form: CollectForm,
        rng: &mut R,
    ) -> Result<Vec<FeedEntry>, NewsError> {
        let query = build_query(category, form, rng);
        let mut merged = Vec::new();
        for locale in locales {
            merged.extend(self.feed.search(&query, locale).await?);
        }
        let merged: Vec<FeedEntry> = match form {
            CollectForm::Bundle => merged.into_iter().unique_by(|e| e.link.clone()).collect(),
            CollectForm::Titles => merged.into_iter().unique_by(|e| e.title.clone()).collect(),
        };
        debug!(%query, count = merged.len(), "Merged feed results");
        Ok(merged)
    }
}

/// Join category keywords with ` OR `.
pub fn build_query<R: Rng + ?Sized>(category: &Category, form: CollectForm, rng: &mut R) -> String {
    match form {
        CollectForm::Bundle => category
            .keywords
            .choose_multiple(rng, BUNDLE_QUERY_KEYWORDS)
            .map(String::as_str)
            .join(" OR "),
        CollectForm::Titles => category
            .keywords
            .iter()
            .take(TITLES_QUERY_KEYWORDS)
            .map(String::as_str)
            .join(" OR "),
    }
}

fn shape(category: &Category, mut entries: Vec<FeedEntry>, form: CollectForm) -> CollectOutcome {
    match form {
        CollectForm::Bundle => {
            let main_article = entries.remove(0);
            entries.truncate(RELATED_ARTICLES);
            CollectOutcome::Bundle(NewsBundle {
                category: category.id.clone(),
                category_name: category.name.clone(),
                main_article,
                related_articles: entries,
                collected_at: Local::now().to_rfc3339(),
            })
        }
        CollectForm::Titles => CollectOutcome::Titles {
            category: category.id.clone(),
            category_name: category.name.clone(),
            titles: entries.iter().map(HeadlineItem::from).collect(),
        },
    }
}
