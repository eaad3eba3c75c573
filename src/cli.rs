//! Command-line interface definitions for Auto Blog.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! Credentials and endpoints can be provided via command-line flags, the
//! environment, or a `.env` file loaded before parsing.

use clap::{Parser, Subcommand};

/// Command-line arguments for the Auto Blog pipeline.
///
/// # Examples
///
/// ```sh
/// # Information article from today's news (random weighted category)
/// auto_blog info
///
/// # Force a category and skip the daily cache
/// auto_blog info --category tech --no-cache
///
/// # Experience article from a short memo
/// auto_blog experience "주말에 다녀온 성수동 카페" --category "일상/리뷰"
///
/// # Show the ten newest saved drafts
/// auto_blog list
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Directory holding saved articles, the daily cache and thumbnails
    #[arg(short, long, global = true, env = "AUTO_BLOG_DATA_DIR", default_value = "data")]
    pub data_dir: String,

    /// Optional YAML file replacing the built-in category table
    #[arg(long, global = true, env = "AUTO_BLOG_CATEGORIES")]
    pub categories: Option<String>,

    /// Feed locales to search, e.g. `--locale ko-KR --locale en-US`
    #[arg(long = "locale", global = true)]
    pub locales: Vec<String>,

    /// Gemini API key
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub gemini_api_key: Option<String>,

    /// Gemini model name
    #[arg(long, env = "GEMINI_MODEL", default_value = "gemini-2.5-flash")]
    pub gemini_model: String,

    /// Account used to send the draft
    #[arg(long, env = "GMAIL_ADDRESS")]
    pub gmail_address: Option<String>,

    /// App password for the sending account
    #[arg(long, env = "GMAIL_APP_PASSWORD", hide_env_values = true)]
    pub gmail_app_password: Option<String>,

    /// Address that receives the draft
    #[arg(long, env = "NOTIFY_EMAIL")]
    pub notify_email: Option<String>,

    /// Tistory blog name, used for the "write a new post" link
    #[arg(long, env = "TISTORY_BLOG_NAME")]
    pub blog_name: Option<String>,

    /// SMTP relay host (STARTTLS)
    #[arg(long, env = "SMTP_HOST", default_value = "smtp.gmail.com")]
    pub smtp_host: String,

    /// SMTP relay port
    #[arg(long, env = "SMTP_PORT", default_value_t = 587)]
    pub smtp_port: u16,

    /// Include a generated thumbnail image URL in the email
    #[arg(long, global = true)]
    pub thumbnail_url: bool,
}

#[derive(Subcommand, Debug, PartialEq)]
pub enum Command {
    /// Generate an information article from today's news
    Info {
        /// Category id from the category table (random weighted pick if omitted)
        #[arg(long)]
        category: Option<String>,

        /// Skip the same-day cache for this run
        #[arg(long)]
        no_cache: bool,

        /// Build the prompt from one main article plus related ones
        #[arg(long)]
        bundle: bool,
    },

    /// Generate an experience article from a short memo
    Experience {
        /// What happened, in a sentence or two
        memo: String,

        /// Blog category label for the article
        #[arg(long, default_value = "일상/리뷰")]
        category: String,
    },

    /// Show the ten most recent saved articles
    List,

    /// Download the thumbnail image for a saved article
    Thumbnail {
        /// Article id as printed by `list`
        id: String,
    },
}
