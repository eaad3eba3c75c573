//! Best-effort recovery of an [`ArticleDraft`] from raw model output.
//!
//! The model is asked for a single JSON object, but long HTML-bearing string
//! fields regularly come back with literal control characters or stray
//! unescaped quotes. Rather than discard usable output, [`recover`] runs a
//! cascade of increasingly permissive strategies and returns the first one
//! that yields an article:
//!
//! | # | Strategy | What it tolerates |
//! |---|----------|-------------------|
//! | 1 | [`Strategy::Direct`] | prose or a ```` ```json ```` fence around the object |
//! | 2 | [`Strategy::ControlChars`] | literal newlines/tabs inside string values |
//! | 3 | [`Strategy::FieldSalvage`] | anything, as long as `title` and `content` can be found |
//! | 4 | [`Strategy::QuoteRepair`] | unescaped `"` inside string values |
//!
//! The order is fixed so that the precedence of recovered fields stays
//! predictable. There is no grammar behind strategies 3 and 4; they can pick
//! subtly wrong field boundaries. In particular the salvaged body ends at the
//! first `", "tags"` after `"content"`, so a body that itself contains that
//! text is cut short.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::models::ArticleDraft;
use crate::utils::truncate_chars;

/// How many characters of the original output an error carries.
const EXCERPT_CHARS: usize = 500;

static FENCED_JSON: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```json\s*(.*?)\s*```").expect("valid fence regex"));

static OUTER_OBJECT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\{.*\}").expect("valid object regex"));

static CONTENT_FIELD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)"content"\s*:\s*"(.*?)"\s*,\s*"tags""#).expect("valid content regex")
});

static TAGS_FIELD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)"tags"\s*:\s*\[(.*?)\]"#).expect("valid tags regex"));

/// Scalar fields salvaged one by one in strategy 3.
static SCALAR_FIELDS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    [
        "title",
        "meta_description",
        "category",
        "trend_summary",
        "reader_perspective",
        "selected_topic",
    ]
    .into_iter()
    .map(|field| {
        let pattern = format!(r#"(?s)"{field}"\s*:\s*"((?:[^"\\]|\\.)*)""#);
        (field, Regex::new(&pattern).expect("valid scalar regex"))
    })
    .collect()
});

/// Every strategy failed.
#[derive(Debug, Error)]
pub enum RecoveryError {
    #[error("could not recover an article from model output; original: {excerpt}")]
    Unparseable { excerpt: String },
}

/// The strategy that produced a [`Recovered`] article.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    Direct,
    ControlChars,
    FieldSalvage,
    QuoteRepair,
}

/// A recovered article and how it was obtained.
#[derive(Debug, Clone, PartialEq)]
pub struct Recovered {
    pub article: ArticleDraft,
    pub strategy: Strategy,
}

/// Run the recovery cascade over raw model output.
#[instrument(level = "info", skip_all, fields(bytes = raw.len()))]
pub fn recover(raw: &str) -> Result<Recovered, RecoveryError> {
    let text = isolate_object(raw);

    let cascade = [
        Strategy::Direct,
        Strategy::ControlChars,
        Strategy::FieldSalvage,
        Strategy::QuoteRepair,
    ];

    for strategy in cascade {
        let attempt = match strategy {
            Strategy::Direct => parse_article(text),
            Strategy::ControlChars => parse_article(&escape_control_chars(text)),
            Strategy::FieldSalvage => salvage_fields(text),
            Strategy::QuoteRepair => parse_article(&repair_quotes(text)),
        };
        match attempt {
            Some(article) if strategy == Strategy::Direct => {
                debug!("Model output parsed directly");
                return Ok(Recovered { article, strategy });
            }
            Some(article) => {
                warn!(?strategy, "Model output needed repair");
                return Ok(Recovered { article, strategy });
            }
            None => debug!(?strategy, "Recovery strategy failed"),
        }
    }

    Err(RecoveryError::Unparseable {
        excerpt: truncate_chars(raw, EXCERPT_CHARS),
    })
}

/// Narrow the output to the JSON object: the body of a ```` ```json ````
/// fence if present, then the span from the first `{` to the last `}`.
fn isolate_object(raw: &str) -> &str {
    let text = FENCED_JSON
        .captures(raw)
        .and_then(|c| c.get(1))
        .map_or(raw, |m| m.as_str());
    OUTER_OBJECT.find(text).map_or(text, |m| m.as_str())
}

fn parse_article(text: &str) -> Option<ArticleDraft> {
    serde_json::from_str(text).ok()
}

/// Escape literal newline, carriage-return and tab characters that sit
/// inside string literals and are not already escaped. Whitespace between
/// tokens is left alone.
fn escape_control_chars(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 16);
    let mut in_string = false;
    let mut escaped = false;

    for c in text.chars() {
        if !in_string {
            if c == '"' {
                in_string = true;
            }
            out.push(c);
            continue;
        }
        if escaped {
            escaped = false;
            out.push(c);
            continue;
        }
        match c {
            '\\' => {
                escaped = true;
                out.push(c);
            }
            '"' => {
                in_string = false;
                out.push(c);
            }
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out
}

/// Pull known fields out one at a time. Requires `title` and `content`.
fn salvage_fields(text: &str) -> Option<ArticleDraft> {
    let content = CONTENT_FIELD
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| decode_fragment(&m.as_str().replace(['\n', '\r'], "")))?;

    let mut article = ArticleDraft::new(String::new(), content);
    let mut found_title = false;
    for (field, re) in SCALAR_FIELDS.iter() {
        let Some(value) = re
            .captures(text)
            .and_then(|c| c.get(1))
            .map(|m| decode_fragment(m.as_str()))
        else {
            continue;
        };
        match *field {
            "title" => {
                article.title = value;
                found_title = true;
            }
            "meta_description" => article.meta_description = value,
            "category" => article.category = value,
            "trend_summary" => article.trend_summary = Some(value),
            "reader_perspective" => article.reader_perspective = Some(value),
            "selected_topic" => article.selected_topic = Some(value),
            _ => {}
        }
    }
    if !found_title {
        return None;
    }

    article.tags = TAGS_FIELD
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| split_tags(m.as_str()))
        .unwrap_or_default();

    Some(article)
}

fn split_tags(inner: &str) -> Vec<String> {
    inner
        .split(',')
        .map(|t| t.trim().trim_matches('"').trim())
        .filter(|t| !t.is_empty())
        .map(decode_fragment)
        .collect()
}

/// Decode JSON string escapes in a captured fragment, keeping the raw text
/// when it is not a valid JSON string body.
fn decode_fragment(raw: &str) -> String {
    serde_json::from_str::<String>(&format!("\"{raw}\"")).unwrap_or_else(|_| raw.to_string())
}

/// Escape quotes inside string literals that do not look like they end the
/// string, and escape control characters along the way.
///
/// A quote closes a string when the next non-whitespace character is `:`,
/// `}` or `]`, when it is the end of input, or when it is a `,` that is
/// itself followed by the start of another JSON value.
fn repair_quotes(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len() + 32);
    let mut in_string = false;
    let mut escaped = false;

    for (i, &c) in chars.iter().enumerate() {
        if !in_string {
            if c == '"' {
                in_string = true;
            }
            out.push(c);
            continue;
        }
        if escaped {
            escaped = false;
            out.push(c);
            continue;
        }
        match c {
            '\\' => {
                escaped = true;
                out.push(c);
            }
            '"' if closes_string(&chars[i + 1..]) => {
                in_string = false;
                out.push(c);
            }
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out
}

fn closes_string(rest: &[char]) -> bool {
    let mut tail = rest.iter().copied().filter(|c| !c.is_whitespace());
    match tail.next() {
        None | Some(':') | Some('}') | Some(']') => true,
        Some(',') => matches!(
            tail.next(),
            None | Some('"') | Some('{') | Some('[') | Some('}') | Some(']') | Some('-')
                | Some('0'..='9')
        ),
        _ => false,
    }
}
