//! # Auto Blog
//!
//! A blog-drafting pipeline that collects today's headlines from Google News,
//! asks a generative model for a Korean blog post, saves the draft as JSON
//! and emails a copy-paste friendly rendering to the author.
//!
//! ## Features
//!
//! - Weighted-random or explicit category selection with a fallback category
//! - Multi-locale Google News RSS search with deduplication
//! - Gemini drafting with a same-day cache and a JSON recovery cascade for
//!   malformed model output
//! - Information posts from news, experience posts from a short memo
//! - Multipart email delivery over STARTTLS SMTP
//! - Optional thumbnail images from a text-to-image service
//!
//! ## Usage
//!
//! ```sh
//! auto_blog info --category ai
//! auto_blog experience "주말에 다녀온 성수동 카페"
//! auto_blog list
//! auto_blog thumbnail 20261017_083015_a1b2c3
//! ```
//!
//! ## Architecture
//!
//! The `info` command runs a four-step pipeline:
//! 1. **Collecting**: Search each locale's feed for the category keywords
//! 2. **Drafting**: Send the headlines to the model and recover an article
//! 3. **Saving**: Write the draft under `data/articles/`
//! 4. **Delivering**: Email the draft; failures only print the saved path

use clap::Parser;
use std::error::Error;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod api;
mod cache;
mod cli;
mod config;
mod generator;
mod models;
mod outputs;
mod pipeline;
mod prompts;
mod recovery;
mod sources;
mod utils;

use cli::{Cli, Command};
use config::Settings;
use outputs::json::ArticleStore;
use outputs::thumbnail::Thumbnailer;
use pipeline::Pipeline;
use sources::collector::CollectForm;
use utils::ensure_writable_dir;

#[tokio::main(flavor = "current_thread")]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("auto_blog starting up");

    // .env is optional; real environment variables win.
    if let Ok(path) = dotenvy::dotenv() {
        debug!(path = %path.display(), "Loaded .env");
    }

    let args = Cli::parse();
    debug!(command = ?args.command, data_dir = %args.data_dir, "Parsed CLI arguments");

    let settings = Settings::from_cli(&args)?;

    if let Err(e) = ensure_writable_dir(&settings.data_dir).await {
        error!(
            path = %settings.data_dir.display(),
            error = %e,
            "Data directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    match args.command {
        Command::Info {
            category,
            no_cache,
            bundle,
        } => {
            let pipeline = Pipeline::from_settings(&settings)?;
            let form = if bundle {
                CollectForm::Bundle
            } else {
                CollectForm::Titles
            };
            pipeline
                .run_info(category.as_deref(), !no_cache, form, &mut rand::rng())
                .await?;
        }
        Command::Experience { memo, category } => {
            let pipeline = Pipeline::from_settings(&settings)?;
            pipeline.run_experience(&memo, &category).await?;
        }
        Command::List => {
            pipeline::run_list(&ArticleStore::new(settings.articles_dir())).await?;
        }
        Command::Thumbnail { id } => {
            pipeline::run_thumbnail(
                &ArticleStore::new(settings.articles_dir()),
                &Thumbnailer::new(),
                &settings.categories,
                &id,
                settings.thumbnails_dir(),
            )
            .await?;
        }
    }

    info!(
        elapsed_ms = start_time.elapsed().as_millis(),
        "auto_blog finished"
    );
    Ok(())
}
