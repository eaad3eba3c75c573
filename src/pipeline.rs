//! End-to-end runs behind each subcommand.
//!
//! A [`Pipeline`] owns every component an article run needs, built up front
//! from [`Settings`] so a missing Gemini key fails before any network call.
//! Steps run strictly in order; progress lines go to stdout and structured
//! events to `tracing`.

use rand::Rng;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{info, instrument, warn};

use crate::api::{AskAsync, GeminiClient};
use crate::config::{CategoryTable, ConfigError, Settings};
use crate::generator::{ContentSynthesizer, SynthError};
use crate::models::ArticleDraft;
use crate::outputs::email::{MailRelay, Notifier, SmtpRelay};
use crate::outputs::json::{ArticleStore, DEFAULT_LIST_LIMIT, StoreError};
use crate::outputs::thumbnail::{self, ThumbnailError, Thumbnailer};
use crate::sources::collector::{CollectForm, CollectOutcome, NewsCollector};
use crate::sources::google_news::GoogleNewsFeed;
use crate::sources::{NewsError, NewsFeed};

const BANNER: &str = "==================================================";

/// Any failure that ends a run.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("news collection failed: {0}")]
    News(#[from] NewsError),

    #[error("article generation failed: {0}")]
    Synth(#[from] SynthError),

    #[error("article store failed: {0}")]
    Store(#[from] StoreError),

    #[error("thumbnail failed: {0}")]
    Thumbnail(#[from] ThumbnailError),
}

/// Collector, synthesizer, store and notifier wired together.
pub struct Pipeline<F, A, R> {
    collector: NewsCollector<F>,
    synthesizer: ContentSynthesizer<A>,
    store: ArticleStore,
    notifier: Notifier<R>,
}

impl Pipeline<GoogleNewsFeed, GeminiClient, SmtpRelay> {
    /// Production wiring. Only a missing Gemini key is fatal; incomplete
    /// mail settings turn into failed deliveries after the draft is saved.
    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
        let synthesizer = ContentSynthesizer::from_settings(settings)?;
        let notifier = Notifier::from_settings(&settings.mail, &settings.categories);
        let collector = NewsCollector::new(
            GoogleNewsFeed::new(),
            settings.categories.clone(),
            settings.locales.clone(),
        );
        Ok(Self::new(
            collector,
            synthesizer,
            ArticleStore::new(settings.articles_dir()),
            notifier,
        ))
    }
}

impl<F, A, R> Pipeline<F, A, R>
where
    F: NewsFeed,
    A: AskAsync<Response = String>,
    R: MailRelay,
{
    pub fn new(
        collector: NewsCollector<F>,
        synthesizer: ContentSynthesizer<A>,
        store: ArticleStore,
        notifier: Notifier<R>,
    ) -> Self {
        Self {
            collector,
            synthesizer,
            store,
            notifier,
        }
    }

    /// Collect news, write an information article, save and email it.
    ///
    /// Returns `Ok(None)` when no news could be found for the category or
    /// the fallback.
    #[instrument(level = "info", skip(self, rng))]
    pub async fn run_info<G: Rng + ?Sized>(
        &self,
        category: Option<&str>,
        use_cache: bool,
        form: CollectForm,
        rng: &mut G,
    ) -> Result<Option<ArticleDraft>, PipelineError> {
        println!("{BANNER}\n정보형 글 생성 시작\n{BANNER}");

        println!("\n[1/4] 뉴스 수집 중...");
        let (category_id, headlines) =
            match self.collector.collect(category, None, form, rng).await? {
                CollectOutcome::NoArticles { category, error } => {
                    warn!(%category, %error, "Stopping: nothing to write about");
                    println!("뉴스 수집 실패: {error}");
                    return Ok(None);
                }
                CollectOutcome::Bundle(bundle) => {
                    info!(
                        collected_at = %bundle.collected_at,
                        related = bundle.related_articles.len(),
                        "Collected news bundle"
                    );
                    println!("  - 카테고리: {}", bundle.category_name);
                    println!("  - 메인 기사: {}", bundle.main_article.title);
                    (bundle.category.clone(), bundle.headlines())
                }
                CollectOutcome::Titles {
                    category,
                    category_name,
                    titles,
                } => {
                    println!("  - 카테고리: {category_name}");
                    println!("  - 헤드라인: {}개", titles.len());
                    (category, titles)
                }
            };
        let category = self
            .collector
            .categories()
            .get(&category_id)
            .ok_or_else(|| NewsError::UnknownCategory(category_id.clone()))?;

        println!("\n[2/4] AI 글 생성 중...");
        let mut article = self
            .synthesizer
            .synthesize(&headlines, category, use_cache)
            .await?;
        println!("  - 제목: {}", article.title);
        println!("  - 태그: {}", article.tags.join(", "));

        println!("\n[3/4] 글 저장 중...");
        let id = self.store.save(&mut article).await?;
        println!("  - ID: {id}");

        println!("\n[4/4] 이메일 발송 중...");
        if self.notifier.deliver(&article).await {
            println!("\n완료! 이메일을 확인하세요.");
            println!("티스토리에서 복붙 후 발행하면 됩니다.");
        } else {
            println!("\n이메일 발송 실패. 글은 저장되었습니다.");
            println!("저장 위치: {}", self.store.path_for(&id).display());
        }
        info!(%id, "Info run finished");
        Ok(Some(article))
    }

    /// Write an experience article from `memo`, save and email it.
    #[instrument(level = "info", skip(self, memo))]
    pub async fn run_experience(
        &self,
        memo: &str,
        category_label: &str,
    ) -> Result<ArticleDraft, PipelineError> {
        println!("{BANNER}\n체험형 글 생성 시작\n{BANNER}");

        println!("\n[1/3] AI 글 생성 중...");
        let mut article = self
            .synthesizer
            .synthesize_experience(memo, category_label)
            .await?;
        let photos = article.photo_count.unwrap_or(0);
        println!("  - 제목: {}", article.title);
        println!("  - 필요한 사진 수: {photos}개");

        println!("\n[2/3] 글 저장 중...");
        let id = self.store.save(&mut article).await?;
        println!("  - ID: {id}");

        println!("\n[3/3] 이메일 발송 중...");
        if self.notifier.deliver(&article).await {
            println!("\n완료! 이메일을 확인하세요.");
            println!("사진 {photos}개를 준비한 후 발행하세요.");
        } else {
            println!("\n이메일 발송 실패.");
            println!("저장 위치: {}", self.store.path_for(&id).display());
        }
        info!(%id, "Experience run finished");
        Ok(article)
    }
}

/// Print the newest saved articles.
pub async fn run_list(store: &ArticleStore) -> Result<Vec<ArticleDraft>, PipelineError> {
    println!("\n저장된 글 목록:");
    println!("{}", "-".repeat(BANNER.len()));

    let articles = store.list(DEFAULT_LIST_LIMIT).await?;
    for article in &articles {
        println!("  [{}]", article.id.as_deref().unwrap_or("-"));
        println!("  제목: {}", article.title);
        println!("  생성: {}", article.created_at.as_deref().unwrap_or("-"));
        println!();
    }
    if articles.is_empty() {
        println!("  저장된 글이 없습니다.");
    }
    Ok(articles)
}

/// Download the thumbnail for a saved article to `dir/{id}.png`.
///
/// The article's category label is mapped back to a category id when it
/// matches a configured display name.
#[instrument(level = "info", skip(store, thumbnailer, categories, dir))]
pub async fn run_thumbnail(
    store: &ArticleStore,
    thumbnailer: &Thumbnailer,
    categories: &CategoryTable,
    id: &str,
    dir: PathBuf,
) -> Result<PathBuf, PipelineError> {
    let article = store.load(id).await?;
    let category = thumbnail::category_key(categories, &article.category);

    let path = thumbnailer
        .download(&article.title, &article.tags, category, &dir, &format!("{id}.png"))
        .await?;
    println!("썸네일 저장 완료: {}", path.display());
    Ok(path)
}
