//! Same-day cache of generated drafts.
//!
//! A draft is keyed by the calendar day, the category id and the sorted
//! headline titles, so re-running the pipeline on the same news within a
//! day does not spend another generative call. Entries are plain JSON files:
//!
//! ```text
//! cache_dir/
//! └── 3f9a1c0b7d2e.json   # {"cached_date": ..., "cached_at": ..., "article": {...}}
//! ```
//!
//! The cache is an optimization only. Unreadable or stale entries count as
//! misses, and concurrent runs simply overwrite each other.

use chrono::{Local, NaiveDate};
use sha2::{Digest, Sha256};
use std::path::PathBuf;
use tokio::fs;
use tracing::{debug, info, instrument, warn};

use crate::models::{ArticleDraft, CacheEntry, HeadlineItem};

/// Headline titles that contribute to a key.
const KEY_TITLES: usize = 10;
/// Hex characters kept from the digest.
const KEY_HEX_LEN: usize = 12;

/// Compute the cache key for a day, category and headline set.
///
/// Titles are sorted before truncation, so the order headlines arrive in
/// does not matter.
pub fn cache_key(date: NaiveDate, category: &str, headlines: &[HeadlineItem]) -> String {
    let mut titles: Vec<&str> = headlines.iter().map(|h| h.title.as_str()).collect();
    titles.sort_unstable();
    titles.truncate(KEY_TITLES);

    let mut hasher = Sha256::new();
    hasher.update(date.to_string().as_bytes());
    hasher.update(b"\x1f");
    hasher.update(category.as_bytes());
    for title in titles {
        hasher.update(b"\x1f");
        hasher.update(title.as_bytes());
    }
    let mut key = hex::encode(hasher.finalize());
    key.truncate(KEY_HEX_LEN);
    key
}

/// Directory-backed draft cache.
#[derive(Debug, Clone)]
pub struct DraftCache {
    dir: PathBuf,
}

impl DraftCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Return the cached draft if one was stored under `key` on `today`.
    #[instrument(level = "info", skip(self))]
    pub async fn get(&self, key: &str, today: NaiveDate) -> Option<ArticleDraft> {
        let path = self.path_for(key);
        let bytes = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Cache miss");
                return None;
            }
        };
        let entry: CacheEntry = match serde_json::from_slice(&bytes) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Ignoring unreadable cache entry");
                return None;
            }
        };
        if entry.cached_date != today {
            debug!(cached_date = %entry.cached_date, %today, "Cache entry is stale");
            return None;
        }
        info!(cached_at = %entry.cached_at, "Cache hit");
        Some(entry.article)
    }

    /// Store `article` under `key` for `today`. Failures are logged, not
    /// returned.
    #[instrument(level = "info", skip(self, article))]
    pub async fn put(&self, key: &str, today: NaiveDate, article: &ArticleDraft) {
        let entry = CacheEntry {
            cached_date: today,
            cached_at: Local::now().to_rfc3339(),
            article: article.clone(),
        };
        let path = self.path_for(key);
        let result = async {
            fs::create_dir_all(&self.dir).await?;
            let json = serde_json::to_vec_pretty(&entry)?;
            fs::write(&path, json).await?;
            Ok::<_, Box<dyn std::error::Error>>(())
        }
        .await;

        match result {
            Ok(()) => info!(path = %path.display(), "Cached draft"),
            Err(e) => warn!(path = %path.display(), error = %e, "Failed to write cache entry"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headline(title: &str) -> HeadlineItem {
        HeadlineItem {
            title: title.to_string(),
            source: "S".to_string(),
            locale: "ko-KR".to_string(),
        }
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    #[test]
    fn test_key_is_order_independent() {
        let a = [headline("b"), headline("a")];
        let b = [headline("a"), headline("b")];
        assert_eq!(cache_key(day(17), "ai", &a), cache_key(day(17), "ai", &b));
        assert_eq!(cache_key(day(17), "ai", &a).len(), KEY_HEX_LEN);
        assert!(cache_key(day(17), "ai", &a).chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_key_depends_on_day_and_category() {
        let h = [headline("a")];
        let base = cache_key(day(17), "ai", &h);
        assert_ne!(base, cache_key(day(18), "ai", &h));
        assert_ne!(base, cache_key(day(17), "tech", &h));
    }

    #[test]
    fn test_key_uses_first_ten_sorted_titles() {
        let ten: Vec<_> = (0..10).map(|i| headline(&format!("t{i}"))).collect();
        let mut eleven = ten.clone();
        eleven.push(headline("z-late"));
        assert_eq!(cache_key(day(17), "ai", &ten), cache_key(day(17), "ai", &eleven));
    }

    #[tokio::test]
    async fn test_put_then_get_same_day() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = DraftCache::new(tmp.path().join("cache"));
        let draft = ArticleDraft::new("제목", "<p>본문</p>");

        cache.put("abc", day(17), &draft).await;
        assert_eq!(cache.get("abc", day(17)).await, Some(draft));
    }

    #[tokio::test]
    async fn test_entry_from_yesterday_is_a_miss() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = DraftCache::new(tmp.path());
        cache.put("abc", day(17), &ArticleDraft::new("t", "c")).await;
        assert_eq!(cache.get("abc", day(18)).await, None);
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_a_miss() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = DraftCache::new(tmp.path());
        std::fs::write(tmp.path().join("abc.json"), "{not json").unwrap();
        assert_eq!(cache.get("abc", day(17)).await, None);
        assert_eq!(cache.get("missing", day(17)).await, None);
    }

    #[tokio::test]
    async fn test_entry_file_format() {
        let tmp = tempfile::tempdir().unwrap();
        let cache = DraftCache::new(tmp.path());
        cache.put("abc", day(17), &ArticleDraft::new("t", "c")).await;
        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(tmp.path().join("abc.json")).unwrap())
                .unwrap();
        assert_eq!(raw["cached_date"], "2026-10-17");
        assert!(raw["cached_at"].is_string());
        assert_eq!(raw["article"]["title"], "t");
    }
}
