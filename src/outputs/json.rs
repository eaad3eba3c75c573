//! JSON article store.
//!
//! Every saved draft becomes one pretty-printed file named after its id:
//!
//! ```text
//! articles_dir/
//! ├── 20261017_083015_a1b2c3.json
//! └── 20261017_091244_0f9e8d.json
//! ```
//!
//! Ids start with the local timestamp, so sorting file names in reverse
//! gives newest first. Files are written once and never modified.

use chrono::{DateTime, Local};
use rand::Rng;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::{info, instrument, warn};

use crate::models::ArticleDraft;

/// Default number of articles returned by [`ArticleStore::list`].
pub const DEFAULT_LIST_LIMIT: usize = 10;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("article store I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid article JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid article id {0:?}")]
    InvalidId(String),
}

impl StoreError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Build an article id: local timestamp plus six random hex digits.
pub fn article_id<R: Rng + ?Sized>(now: &DateTime<Local>, rng: &mut R) -> String {
    let suffix: u32 = rng.random_range(0..0x100_0000);
    format!("{}_{suffix:06x}", now.format("%Y%m%d_%H%M%S"))
}

/// Ids name a single file inside the store, never a path.
fn check_id(id: &str) -> Result<(), StoreError> {
    if id.is_empty() || id.contains(['/', '\\']) || id.contains("..") {
        return Err(StoreError::InvalidId(id.to_string()));
    }
    Ok(())
}

/// Directory of saved articles.
#[derive(Debug, Clone)]
pub struct ArticleStore {
    dir: PathBuf,
}

impl ArticleStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    /// Stamp `draft` with a fresh id and creation time, write it, and
    /// return the id.
    pub async fn save(&self, draft: &mut ArticleDraft) -> Result<String, StoreError> {
        self.save_with(draft, Local::now(), &mut rand::rng()).await
    }

    #[instrument(level = "info", skip(self, draft, rng), fields(dir = %self.dir.display()))]
    pub async fn save_with<R: Rng + ?Sized>(
        &self,
        draft: &mut ArticleDraft,
        now: DateTime<Local>,
        rng: &mut R,
    ) -> Result<String, StoreError> {
        let id = article_id(&now, rng);
        draft.id = Some(id.clone());
        draft.created_at = Some(now.to_rfc3339());

        let json = serde_json::to_string_pretty(draft)?;
        fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| StoreError::io(&self.dir, e))?;
        let path = self.path_for(&id);
        fs::write(&path, json)
            .await
            .map_err(|e| StoreError::io(&path, e))?;

        info!(path = %path.display(), "Saved article");
        Ok(id)
    }

    /// Read one article back by id.
    pub async fn load(&self, id: &str) -> Result<ArticleDraft, StoreError> {
        check_id(id)?;
        let path = self.path_for(id);
        let text = fs::read_to_string(&path)
            .await
            .map_err(|e| StoreError::io(&path, e))?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Up to `limit` articles, newest first. Files that fail to parse are
    /// skipped with a warning.
    #[instrument(level = "info", skip(self), fields(dir = %self.dir.display()))]
    pub async fn list(&self, limit: usize) -> Result<Vec<ArticleDraft>, StoreError> {
        let mut names = Vec::new();
        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io(&self.dir, e)),
        };
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StoreError::io(&self.dir, e))?
        {
            let name = entry.file_name().to_string_lossy().into_owned();
            if name.ends_with(".json") {
                names.push(name);
            }
        }
        names.sort_unstable_by(|a, b| b.cmp(a));

        let mut articles = Vec::with_capacity(limit.min(names.len()));
        for name in names.into_iter().take(limit) {
            let path = self.dir.join(&name);
            let parsed = match fs::read_to_string(&path).await {
                Ok(text) => serde_json::from_str::<ArticleDraft>(&text).map_err(StoreError::from),
                Err(e) => Err(StoreError::io(&path, e)),
            };
            match parsed {
                Ok(article) => articles.push(article),
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping unreadable article"),
            }
        }
        Ok(articles)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 10, 17, h, m, s).unwrap()
    }

    #[test]
    fn test_article_id_format() {
        let mut rng = StdRng::seed_from_u64(1);
        let id = article_id(&at(8, 30, 15), &mut rng);
        let (stamp, suffix) = id.rsplit_once('_').unwrap();
        assert_eq!(stamp, "20261017_083015");
        assert_eq!(suffix.len(), 6);
        assert!(suffix.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[tokio::test]
    async fn test_save_then_list_newest_first() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ArticleStore::new(tmp.path().join("articles"));
        let mut rng = StdRng::seed_from_u64(7);

        let mut older = ArticleDraft::new("이전 글", "<p>a</p>");
        let mut newer = ArticleDraft::new("새 글", "<p>b</p>");
        newer.tags = vec!["AI".into()];
        let old_id = store.save_with(&mut older, at(8, 0, 0), &mut rng).await.unwrap();
        let new_id = store.save_with(&mut newer, at(9, 0, 0), &mut rng).await.unwrap();
        std::fs::write(tmp.path().join("articles/notes.txt"), "ignored").unwrap();

        let listed = store.list(DEFAULT_LIST_LIMIT).await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0], newer);
        assert_eq!(listed[0].id.as_deref(), Some(new_id.as_str()));
        assert_eq!(listed[1].id.as_deref(), Some(old_id.as_str()));
        assert_eq!(listed[1].created_at, Some(at(8, 0, 0).to_rfc3339()));

        assert_eq!(store.list(1).await.unwrap().len(), 1);
        assert_eq!(store.load(&old_id).await.unwrap(), older);
    }

    #[tokio::test]
    async fn test_list_missing_dir_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ArticleStore::new(tmp.path().join("nope"));
        assert!(store.list(DEFAULT_LIST_LIMIT).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_list_skips_corrupt_files() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ArticleStore::new(tmp.path());
        std::fs::write(tmp.path().join("20261017_000000_ffffff.json"), "{").unwrap();
        let mut draft = ArticleDraft::new("t", "c");
        store
            .save_with(&mut draft, at(1, 0, 0), &mut StdRng::seed_from_u64(3))
            .await
            .unwrap();
        let listed = store.list(DEFAULT_LIST_LIMIT).await.unwrap();
        assert_eq!(listed, vec![draft]);
    }

    #[tokio::test]
    async fn test_load_rejects_ids_outside_store() {
        let tmp = tempfile::tempdir().unwrap();
        let store = ArticleStore::new(tmp.path().join("articles"));
        std::fs::write(tmp.path().join("x.json"), r#"{"title":"t","content":"c"}"#).unwrap();

        for id in ["../x", "../../x", "a/b", "a\\b", ".."] {
            let err = store.load(id).await.unwrap_err();
            assert!(matches!(err, StoreError::InvalidId(_)), "{id}");
        }
        assert!(matches!(store.load("").await, Err(StoreError::InvalidId(_))));
    }

    #[tokio::test]
    async fn test_load_missing_is_io_error() {
        let tmp = tempfile::tempdir().unwrap();
        let err = ArticleStore::new(tmp.path()).load("x").await.unwrap_err();
        assert!(matches!(err, StoreError::Io { .. }));
    }
}
