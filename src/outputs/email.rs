//! Email delivery of finished drafts.
//!
//! [`Notifier`] renders an article into a copy-paste friendly
//! multipart/alternative email and hands it to a [`MailRelay`]. The
//! production relay is [`SmtpRelay`], which speaks STARTTLS with app-password
//! credentials through `lettre`.
//!
//! Delivery never fails the run: [`Notifier::deliver`] logs the error and
//! returns `false`, and the caller points the user at the saved file instead.
//! That includes missing mail settings, which only surface when a message
//! is sent.

use chrono::Local;
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use crate::config::{CategoryTable, MailSettings, non_blank};
use crate::models::{ArticleDraft, ArticleKind};
use crate::outputs::thumbnail;
use crate::utils::html_to_plain;

const SUBJECT_PREFIX: &str = "[Auto-Blog]";
const RULE: &str = "==================================================";

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    #[error("email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("email build error: {0}")]
    Build(#[from] lettre::error::Error),

    #[error("SMTP server rejected the message: {0}")]
    Rejected(String),

    #[error("mail is not configured: {0} is not set")]
    Unconfigured(&'static str),
}

/// Sends a fully built message.
pub trait MailRelay {
    async fn send(&self, message: Message) -> Result<(), NotifyError>;
}

/// STARTTLS SMTP relay with username/password credentials.
pub struct SmtpRelay {
    host: String,
    port: u16,
    credentials: Option<Credentials>,
}

impl std::fmt::Debug for SmtpRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpRelay")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("has_credentials", &self.credentials.is_some())
            .finish()
    }
}

impl SmtpRelay {
    /// Without both a user and a password every send fails with
    /// [`NotifyError::Unconfigured`].
    pub fn new(host: &str, port: u16, user: Option<String>, password: Option<String>) -> Self {
        Self {
            host: host.to_string(),
            port,
            credentials: user.zip(password).map(|(u, p)| Credentials::new(u, p)),
        }
    }
}

impl MailRelay for SmtpRelay {
    #[instrument(level = "info", skip_all, fields(host = %self.host, port = self.port))]
    async fn send(&self, message: Message) -> Result<(), NotifyError> {
        let Some(credentials) = &self.credentials else {
            return Err(NotifyError::Unconfigured("GMAIL_APP_PASSWORD"));
        };
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.host)?
            .port(self.port)
            .credentials(credentials.clone())
            .build();
        let response = mailer.send(message).await?;
        if !response.is_positive() {
            return Err(NotifyError::Rejected(response.code().to_string()));
        }
        Ok(())
    }
}

/// Renders articles and delivers them to one recipient.
#[derive(Debug)]
pub struct Notifier<R> {
    relay: R,
    from: Option<String>,
    to: Option<String>,
    blog_name: Option<String>,
    include_thumbnail: bool,
    categories: CategoryTable,
}

impl Notifier<SmtpRelay> {
    /// SMTP-backed notifier. Never fails: incomplete mail settings are
    /// logged here and make every [`deliver`](Notifier::deliver) return
    /// `false`.
    pub fn from_settings(settings: &MailSettings, categories: &CategoryTable) -> Self {
        let address = non_blank(&settings.address);
        let password = non_blank(&settings.app_password);
        let recipient = non_blank(&settings.recipient);
        if address.is_none() || password.is_none() || recipient.is_none() {
            warn!("Mail settings incomplete; drafts will be saved but not emailed");
        }
        let relay = SmtpRelay::new(&settings.smtp_host, settings.smtp_port, address.clone(), password);
        Self {
            relay,
            from: address,
            to: recipient,
            blog_name: None,
            include_thumbnail: false,
            categories: categories.clone(),
        }
        .with_blog(settings.blog_name.clone())
        .with_thumbnail(settings.include_thumbnail)
    }
}

impl<R: MailRelay> Notifier<R> {
    pub fn new(relay: R, from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            relay,
            from: Some(from.into()),
            to: Some(to.into()),
            blog_name: None,
            include_thumbnail: false,
            categories: CategoryTable::default(),
        }
    }

    /// Category table used to pick the thumbnail style.
    pub fn with_categories(mut self, categories: CategoryTable) -> Self {
        self.categories = categories;
        self
    }

    pub fn with_blog(mut self, blog_name: Option<String>) -> Self {
        self.blog_name = blog_name.filter(|b| !b.trim().is_empty());
        self
    }

    pub fn with_thumbnail(mut self, include: bool) -> Self {
        self.include_thumbnail = include;
        self
    }

    #[cfg(test)]
    pub(crate) fn relay(&self) -> &R {
        &self.relay
    }

    /// Tistory "new post" page, when a blog name is configured.
    pub fn write_url(&self) -> Option<String> {
        self.blog_name
            .as_ref()
            .map(|blog| format!("https://{blog}.tistory.com/manage/newpost"))
    }

    /// Plain-text and HTML bodies for `article`.
    pub fn render(&self, article: &ArticleDraft) -> (String, String) {
        let generated = Local::now().format("%Y년 %m월 %d일 %H:%M").to_string();
        let kind = article.article_type.unwrap_or(ArticleKind::Experience).label();
        let tags = article.tags.join(", ");
        let write_url = self.write_url();

        let mut plain = format!(
            "새 블로그 글이 준비되었습니다\n생성일: {generated}\n유형: {kind}\n\n{RULE}\n\n\
             [제목]\n{}\n\n[태그]\n{tags}\n\n[메타 설명]\n{}\n\n[본문]\n{}\n\n{RULE}\n",
            article.title,
            article.meta_description,
            html_to_plain(&article.content).trim(),
        );
        if let Some(url) = &write_url {
            plain.push_str(&format!("\n티스토리 글쓰기: {url}\n"));
        }

        let thumbnail_section = if self.include_thumbnail {
            let category = thumbnail::category_key(&self.categories, &article.category);
            let url = thumbnail::image_url(&article.title, &article.tags, category);
            format!(
                r#"<div class="section"><div class="section-title">썸네일</div><img src="{url}" alt="thumbnail" width="320"></div>"#
            )
        } else {
            String::new()
        };
        let button_section = write_url
            .map(|url| {
                format!(
                    r#"<div class="button-section"><a href="{url}" class="write-btn" target="_blank">티스토리에서 글쓰기</a></div>"#
                )
            })
            .unwrap_or_default();

        let html = format!(
            r#"<!DOCTYPE html>
<html>
<head>
<meta charset="UTF-8">
<style>
body {{ font-family: -apple-system, 'Segoe UI', Roboto, sans-serif; line-height: 1.6; color: #333; max-width: 900px; margin: 0 auto; padding: 20px; background: #f5f5f5; }}
.container {{ background: white; border-radius: 12px; overflow: hidden; }}
.header {{ background: #667eea; color: white; padding: 25px; }}
.section {{ padding: 20px 25px; border-bottom: 1px solid #eee; }}
.section-title {{ font-size: 12px; color: #888; margin-bottom: 8px; }}
.copy-box {{ background: #f8f9fa; border: 1px solid #e9ecef; border-radius: 8px; padding: 15px; }}
.button-section {{ text-align: center; padding: 30px; }}
.write-btn {{ background: #ff6b35; color: white; padding: 16px 50px; border-radius: 8px; text-decoration: none; font-weight: bold; }}
.footer {{ text-align: center; padding: 20px; color: #888; font-size: 12px; }}
</style>
</head>
<body>
<div class="container">
<div class="header"><h1>새 블로그 글이 준비되었습니다</h1><div class="date">{generated} | {kind}</div></div>
<div class="section"><div class="section-title">제목 (복사하세요)</div><div class="copy-box">{title}</div></div>
<div class="section"><div class="section-title">태그 (복사하세요)</div><div class="copy-box">{tags}</div></div>
<div class="section"><div class="section-title">메타 설명</div><div>{meta}</div></div>
{thumbnail_section}
<div class="section"><div class="section-title">본문 (HTML 모드에서 복사하세요)</div><div class="copy-box">{content}</div></div>
{button_section}
<div class="footer"><p>카테고리: {category} | 글 ID: {id}</p></div>
</div>
</body>
</html>
"#,
            title = article.title,
            meta = article.meta_description,
            content = article.content,
            category = article.category,
            id = article.id.as_deref().unwrap_or("N/A"),
        );

        (plain, html)
    }

    fn build_message(&self, article: &ArticleDraft) -> Result<Message, NotifyError> {
        let from = self
            .from
            .as_deref()
            .ok_or(NotifyError::Unconfigured("GMAIL_ADDRESS"))?;
        let to = self
            .to
            .as_deref()
            .ok_or(NotifyError::Unconfigured("NOTIFY_EMAIL"))?;
        let (plain, html) = self.render(article);
        let message = Message::builder()
            .from(from.parse::<Mailbox>()?)
            .to(to.parse::<Mailbox>()?)
            .subject(format!("{SUBJECT_PREFIX} {}", article.title))
            .multipart(MultiPart::alternative_plain_html(plain, html))?;
        Ok(message)
    }

    /// Email `article` to the recipient. Returns whether it was accepted.
    #[instrument(level = "info", skip_all, fields(to = self.to.as_deref().unwrap_or("-"), title = %article.title))]
    pub async fn deliver(&self, article: &ArticleDraft) -> bool {
        let result = match self.build_message(article) {
            Ok(message) => self.relay.send(message).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => {
                info!("Article email sent");
                true
            }
            Err(e) => {
                error!(error = %e, "Article email failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct RecordingRelay {
        sent: RefCell<Vec<Message>>,
    }

    impl MailRelay for RecordingRelay {
        async fn send(&self, message: Message) -> Result<(), NotifyError> {
            self.sent.borrow_mut().push(message);
            Ok(())
        }
    }

    struct RejectingRelay;

    impl MailRelay for RejectingRelay {
        async fn send(&self, _message: Message) -> Result<(), NotifyError> {
            Err(NotifyError::Rejected("535 authentication failed".into()))
        }
    }

    fn article() -> ArticleDraft {
        let mut a = ArticleDraft::new(
            "AI 모델 X 출시",
            "<h2>들어가며</h2><p>첫 문단</p>\n\n\n<p>둘째 문단</p>",
        );
        a.meta_description = "요약".into();
        a.tags = vec!["AI".into(), "모델".into()];
        a.category = "AI/인공지능".into();
        a.article_type = Some(ArticleKind::Info);
        a.id = Some("20261017_083015_a1b2c3".into());
        a
    }

    #[test]
    fn test_render_with_blog() {
        let notifier = Notifier::new(RecordingRelay::default(), "me@gmail.com", "you@gmail.com")
            .with_blog(Some("myblog".into()));
        let (plain, html) = notifier.render(&article());

        assert!(plain.contains("유형: 정보형 글"));
        assert!(plain.contains("[태그]\nAI, 모델"));
        assert!(plain.contains("\n들어가며\n"));
        assert!(!plain.contains("<p>"));
        assert!(!plain.contains("\n\n\n"));
        assert!(plain.contains("티스토리 글쓰기: https://myblog.tistory.com/manage/newpost"));

        assert!(html.contains("<div class=\"copy-box\">AI, 모델</div>"));
        assert!(html.contains("<h2>들어가며</h2>"));
        assert!(html.contains("href=\"https://myblog.tistory.com/manage/newpost\""));
        assert!(html.contains("글 ID: 20261017_083015_a1b2c3"));
        assert!(!html.contains("image.pollinations.ai"));
    }

    #[test]
    fn test_render_without_blog_omits_write_url() {
        let notifier = Notifier::new(RecordingRelay::default(), "me@gmail.com", "you@gmail.com")
            .with_blog(Some("  ".into()))
            .with_thumbnail(true);
        let (plain, html) = notifier.render(&article());

        assert_eq!(notifier.write_url(), None);
        assert!(!plain.contains("tistory.com"));
        assert!(!html.contains("tistory.com"));
        assert!(html.contains("<img src=\"https://image.pollinations.ai/prompt/"));
    }

    #[tokio::test]
    async fn test_deliver_sends_multipart_message() {
        let notifier = Notifier::new(RecordingRelay::default(), "me@gmail.com", "you@gmail.com");
        assert!(notifier.deliver(&article()).await);

        let sent = notifier.relay.sent.borrow();
        assert_eq!(sent.len(), 1);
        let raw = String::from_utf8(sent[0].formatted()).unwrap();
        assert!(raw.contains("multipart/alternative"));
        assert!(raw.contains("From: me@gmail.com"));
        assert!(raw.contains("To: you@gmail.com"));
        assert_eq!(sent[0].envelope().to().len(), 1);
    }

    #[tokio::test]
    async fn test_deliver_returns_false_on_rejected_auth() {
        let notifier = Notifier::new(RejectingRelay, "me@gmail.com", "you@gmail.com");
        assert!(!notifier.deliver(&article()).await);
    }

    #[tokio::test]
    async fn test_deliver_returns_false_on_bad_address() {
        let notifier = Notifier::new(RecordingRelay::default(), "not an address", "you@gmail.com");
        assert!(!notifier.deliver(&article()).await);
        assert!(notifier.relay.sent.borrow().is_empty());
    }

    fn mail_settings() -> MailSettings {
        MailSettings {
            smtp_host: "smtp.gmail.com".into(),
            smtp_port: 587,
            address: None,
            app_password: None,
            recipient: None,
            blog_name: Some("myblog".into()),
            include_thumbnail: false,
        }
    }

    #[test]
    fn test_thumbnail_uses_category_style() {
        let notifier = Notifier::new(RecordingRelay::default(), "me@gmail.com", "you@gmail.com")
            .with_thumbnail(true);
        let article = article();
        let (_, html) = notifier.render(&article);

        let expected = thumbnail::image_url(&article.title, &article.tags, "ai");
        assert!(html.contains(&format!("<img src=\"{expected}\"")));
        assert!(html.contains("neural%20network"));
    }

    #[test]
    fn test_thumbnail_follows_configured_categories() {
        let table = CategoryTable::from_yaml(
            "fallback: economy\ncategories:\n  - id: economy\n    name: \"돈 이야기\"\n    weight: 1.0\n    keywords: [\"주식\"]\n",
        )
        .unwrap();
        let mut article = article();
        article.category = "돈 이야기".into();
        let notifier = Notifier::new(RecordingRelay::default(), "me@gmail.com", "you@gmail.com")
            .with_thumbnail(true)
            .with_categories(table);
        let (_, html) = notifier.render(&article);
        assert!(html.contains("growth%20charts"));
    }

    #[tokio::test]
    async fn test_missing_mail_settings_fail_at_delivery() {
        let notifier = Notifier::from_settings(&mail_settings(), &CategoryTable::default());
        assert_eq!(
            notifier.write_url().as_deref(),
            Some("https://myblog.tistory.com/manage/newpost")
        );
        assert!(!notifier.deliver(&article()).await);

        let err = notifier.build_message(&article()).unwrap_err();
        assert!(matches!(err, NotifyError::Unconfigured("GMAIL_ADDRESS")));
    }

    #[tokio::test]
    async fn test_missing_password_fails_before_connecting() {
        let mut settings = mail_settings();
        settings.address = Some("me@gmail.com".into());
        settings.recipient = Some("you@gmail.com".into());
        let notifier = Notifier::from_settings(&settings, &CategoryTable::default());

        let message = notifier.build_message(&article()).unwrap();
        let err = notifier.relay.send(message).await.unwrap_err();
        assert!(matches!(err, NotifyError::Unconfigured("GMAIL_APP_PASSWORD")));
        assert!(!notifier.deliver(&article()).await);
    }
}
