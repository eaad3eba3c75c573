//! Article synthesis.
//!
//! [`ContentSynthesizer`] turns headlines or a user memo into an
//! [`ArticleDraft`]: fill a prompt, make one generative call, run the
//! recovery cascade and stamp provenance. Information-style drafts go
//! through the same-day [`DraftCache`]; experience drafts never do.

use chrono::{Local, NaiveDate};
use thiserror::Error;
use tracing::{info, instrument};

use crate::api::{ApiError, AskAsync, GeminiClient};
use crate::cache::{DraftCache, cache_key};
use crate::config::{Category, ConfigError, Settings};
use crate::models::{ArticleDraft, ArticleKind, HeadlineItem};
use crate::prompts;
use crate::recovery::{RecoveryError, recover};

/// Errors that fail a synthesis run.
#[derive(Debug, Error)]
pub enum SynthError {
    #[error("generative call failed: {0}")]
    Api(#[from] ApiError),

    #[error(transparent)]
    Recovery(#[from] RecoveryError),
}

/// Generates drafts through an [`AskAsync`] client.
pub struct ContentSynthesizer<A> {
    client: A,
    cache: Option<DraftCache>,
    today: Box<dyn Fn() -> NaiveDate>,
}

impl ContentSynthesizer<GeminiClient> {
    /// Gemini-backed synthesizer caching under `settings.cache_dir()`.
    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
        let client = GeminiClient::new(&settings.gemini)?;
        Ok(Self::new(client, Some(DraftCache::new(settings.cache_dir()))))
    }
}

impl<A> ContentSynthesizer<A>
where
    A: AskAsync<Response = String>,
{
    pub fn new(client: A, cache: Option<DraftCache>) -> Self {
        Self {
            client,
            cache,
            today: Box::new(|| Local::now().date_naive()),
        }
    }

    /// Replace the calendar used for cache keys and freshness.
    #[cfg(test)]
    pub(crate) fn with_clock(mut self, today: impl Fn() -> NaiveDate + 'static) -> Self {
        self.today = Box::new(today);
        self
    }

    #[cfg(test)]
    pub(crate) fn client(&self) -> &A {
        &self.client
    }

    async fn generate(&self, prompt: &str) -> Result<ArticleDraft, SynthError> {
        let raw = self.client.ask(prompt).await?;
        Ok(recover(&raw)?.article)
    }

    /// Write an information-style draft about `headlines` in `category`.
    ///
    /// With `use_cache`, a draft generated earlier today for the same
    /// category and headline titles is returned unchanged.
    #[instrument(level = "info", skip(self, headlines, category), fields(category = %category.id, headlines = headlines.len()))]
    pub async fn synthesize(
        &self,
        headlines: &[HeadlineItem],
        category: &Category,
        use_cache: bool,
    ) -> Result<ArticleDraft, SynthError> {
        let today = (self.today)();
        let key = cache_key(today, &category.id, headlines);
        let cache = self.cache.as_ref().filter(|_| use_cache);

        if let Some(cache) = cache {
            if let Some(cached) = cache.get(&key, today).await {
                return Ok(cached);
            }
        }

        let prompt = prompts::info_article(&category.name, &prompts::headline_block(headlines));
        let mut draft = self.generate(&prompt).await?;
        draft.article_type = Some(ArticleKind::Info);
        draft.source_topic = Some(
            draft
                .selected_topic
                .clone()
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| category.name.clone()),
        );
        draft.source_news = headlines.first().map(|h| h.title.clone());
        info!(title = %draft.title, "Synthesized info article");

        if let Some(cache) = cache {
            cache.put(&key, today, &draft).await;
        }
        Ok(draft)
    }

    /// Write an experience-style draft from a short first-person memo.
    #[instrument(level = "info", skip(self, memo), fields(memo_chars = memo.chars().count()))]
    pub async fn synthesize_experience(
        &self,
        memo: &str,
        category_label: &str,
    ) -> Result<ArticleDraft, SynthError> {
        let prompt = prompts::experience_article(memo, category_label);
        let mut draft = self.generate(&prompt).await?;
        draft.article_type = Some(ArticleKind::Experience);
        draft.user_memo = Some(memo.to_string());
        draft.source_topic = Some(category_label.to_string());
        info!(title = %draft.title, photos = ?draft.photo_count, "Synthesized experience article");
        Ok(draft)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    /// Replies with a fixed body and counts calls.
    struct FakeModel {
        reply: String,
        calls: Rc<Cell<usize>>,
        prompts: RefCell<Vec<String>>,
    }

    impl FakeModel {
        fn new(reply: &str) -> (Self, Rc<Cell<usize>>) {
            let calls = Rc::new(Cell::new(0));
            let model = Self {
                reply: reply.to_string(),
                calls: Rc::clone(&calls),
                prompts: RefCell::new(Vec::new()),
            };
            (model, calls)
        }
    }

    impl AskAsync for FakeModel {
        type Response = String;

        async fn ask(&self, text: &str) -> Result<String, ApiError> {
            self.calls.set(self.calls.get() + 1);
            self.prompts.borrow_mut().push(text.to_string());
            Ok(self.reply.clone())
        }
    }

    struct FailingModel;

    impl AskAsync for FailingModel {
        type Response = String;

        async fn ask(&self, _text: &str) -> Result<String, ApiError> {
            Err(ApiError::Status {
                status: 429,
                message: "quota".into(),
            })
        }
    }

    const REPLY: &str = r#"{"title":"AI 요약","content":"<p>본문</p>","tags":["AI"],"selected_topic":"모델 X"}"#;

    fn category() -> Category {
        Category {
            id: "ai".into(),
            name: "AI/인공지능".into(),
            keywords: vec!["AI".into()],
            weight: 1.0,
        }
    }

    fn headlines() -> Vec<HeadlineItem> {
        vec![
            HeadlineItem {
                title: "첫 번째".into(),
                source: "A".into(),
                locale: "ko-KR".into(),
            },
            HeadlineItem {
                title: "두 번째".into(),
                source: "B".into(),
                locale: "en-US".into(),
            },
        ]
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
    }

    #[tokio::test]
    async fn test_info_draft_provenance() {
        let (model, calls) = FakeModel::new(REPLY);
        let synth = ContentSynthesizer::new(model, None);
        let draft = synth.synthesize(&headlines(), &category(), true).await.unwrap();

        assert_eq!(calls.get(), 1);
        assert_eq!(draft.title, "AI 요약");
        assert_eq!(draft.article_type, Some(ArticleKind::Info));
        assert_eq!(draft.source_topic.as_deref(), Some("모델 X"));
        assert_eq!(draft.source_news.as_deref(), Some("첫 번째"));

        let prompt = &synth.client.prompts.borrow()[0];
        assert!(prompt.contains("- 첫 번째 (A)\n- 두 번째 (B)"));
        assert!(prompt.contains("AI/인공지능"));
    }

    #[tokio::test]
    async fn test_source_topic_falls_back_to_category_name() {
        let (model, _) = FakeModel::new(r#"{"title":"T","content":"C"}"#);
        let synth = ContentSynthesizer::new(model, None);
        let draft = synth.synthesize(&headlines(), &category(), false).await.unwrap();
        assert_eq!(draft.source_topic.as_deref(), Some("AI/인공지능"));
    }

    #[tokio::test]
    async fn test_same_day_cache_hit_skips_call() {
        let tmp = tempfile::tempdir().unwrap();
        let (model, calls) = FakeModel::new(REPLY);
        let synth = ContentSynthesizer::new(model, Some(DraftCache::new(tmp.path())))
            .with_clock(|| day(17));

        let first = synth.synthesize(&headlines(), &category(), true).await.unwrap();
        let mut reordered = headlines();
        reordered.reverse();
        let second = synth.synthesize(&reordered, &category(), true).await.unwrap();

        assert_eq!(calls.get(), 1);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_next_day_is_a_miss() {
        let tmp = tempfile::tempdir().unwrap();
        let (model, calls) = FakeModel::new(REPLY);
        let today = Rc::new(Cell::new(day(17)));
        let clock = Rc::clone(&today);
        let synth = ContentSynthesizer::new(model, Some(DraftCache::new(tmp.path())))
            .with_clock(move || clock.get());

        synth.synthesize(&headlines(), &category(), true).await.unwrap();
        today.set(day(18));
        synth.synthesize(&headlines(), &category(), true).await.unwrap();

        assert_eq!(calls.get(), 2);
    }

    #[tokio::test]
    async fn test_no_cache_neither_reads_nor_writes() {
        let tmp = tempfile::tempdir().unwrap();
        let (model, calls) = FakeModel::new(REPLY);
        let synth = ContentSynthesizer::new(model, Some(DraftCache::new(tmp.path())))
            .with_clock(|| day(17));

        synth.synthesize(&headlines(), &category(), false).await.unwrap();
        synth.synthesize(&headlines(), &category(), false).await.unwrap();

        assert_eq!(calls.get(), 2);
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_experience_draft_provenance() {
        let (model, _) =
            FakeModel::new(r#"{"title":"카페 후기","content":"<p>좋았다</p>","photo_count":"4"}"#);
        let synth = ContentSynthesizer::new(model, None);
        let draft = synth
            .synthesize_experience("성수동 카페 방문", "일상/리뷰")
            .await
            .unwrap();

        assert_eq!(draft.article_type, Some(ArticleKind::Experience));
        assert_eq!(draft.user_memo.as_deref(), Some("성수동 카페 방문"));
        assert_eq!(draft.source_topic.as_deref(), Some("일상/리뷰"));
        assert_eq!(draft.photo_count, Some(4));
    }

    #[tokio::test]
    async fn test_repaired_reply_becomes_draft() {
        let (model, calls) = FakeModel::new(
            "```json\n{\"title\":\"AI 요약\",\"content\":\"<p>첫 줄\n둘째 줄</p>\",\"tags\":[\"AI\"]}\n```",
        );
        let synth = ContentSynthesizer::new(model, None);
        let draft = synth.synthesize(&headlines(), &category(), false).await.unwrap();

        assert_eq!(calls.get(), 1);
        assert_eq!(draft.content, "<p>첫 줄\n둘째 줄</p>");
        assert_eq!(draft.article_type, Some(ArticleKind::Info));
    }

    #[tokio::test]
    async fn test_unrecoverable_output_is_error() {
        let (model, _) = FakeModel::new("sorry, I cannot help with that");
        let synth = ContentSynthesizer::new(model, None);
        let err = synth.synthesize(&headlines(), &category(), false).await.unwrap_err();
        assert!(matches!(err, SynthError::Recovery(_)));
        assert!(err.to_string().contains("sorry, I cannot help"));
    }

    #[tokio::test]
    async fn test_api_failure_is_error() {
        let synth = ContentSynthesizer::new(FailingModel, None);
        let err = synth.synthesize_experience("memo", "일상/리뷰").await.unwrap_err();
        assert!(matches!(err, SynthError::Api(ApiError::Status { status: 429, .. })));
    }
}
