//! Essay body extraction.
//!
//! Pages on the site are table layouts with no semantic markup, so the body
//! is taken as the text of the first content container, cleaned of
//! navigation and script text, and re-segmented into paragraphs by packing
//! sentences together.

use crate::config::SiteSettings;
use crate::error::ScrapeError;
use crate::models::{ArticleContent, ArticleRecord, IndexEntry, store_key};
use crate::scrapers::listing::fetch_page;
use crate::state::PENDING_MARKER;
use crate::store::ArticleStore;
use crate::utils::{now_iso, word_count};
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use serde_json::Map;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

/// Containers tried in order; the first match holds the essay.
const CONTENT_SELECTORS: [&str; 5] = ["table", "body", "main", ".content", "#content"];

/// Text under these elements is never part of the body.
const SKIPPED_TAGS: [&str; 6] = ["script", "style", "nav", "header", "footer", "iframe"];

/// A paragraph keeps absorbing sentences while shorter than this (chars).
const PARAGRAPH_TARGET_CHARS: usize = 200;

/// Paragraphs with this many words or fewer are dropped as page chrome.
const MAX_DROPPED_WORDS: usize = 5;

const GROUP_SIZE: usize = 10;
const GROUP_PAUSE: Duration = Duration::from_secs(3);

fn collect_text(root: ElementRef) -> String {
    let mut out = String::new();
    for node in root.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let skipped = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .is_some_and(|e| SKIPPED_TAGS.contains(&e.name()))
        });
        if !skipped {
            out.push_str(text);
        }
    }
    out
}

/// Visible body text of a page, before paragraph segmentation.
pub fn extract_text(html: &str) -> Result<String, ScrapeError> {
    let document = Html::parse_document(html);
    for css in CONTENT_SELECTORS {
        let selector = Selector::parse(css).map_err(|e| ScrapeError::Selector(e.to_string()))?;
        if let Some(container) = document.select(&selector).next() {
            return Ok(collect_text(container));
        }
    }
    Ok(collect_text(document.root_element()))
}

fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut prev = None;
    for (i, c) in text.char_indices() {
        if c == ' ' && matches!(prev, Some('.' | '!' | '?')) {
            sentences.push(&text[start..i]);
            start = i + 1;
        }
        prev = Some(c);
    }
    sentences.push(&text[start..]);
    sentences
}

/// Segment raw page text into paragraphs.
///
/// Whitespace is collapsed, the text is cut after sentence-ending
/// punctuation, and sentences are appended to the current paragraph until it
/// reaches [`PARAGRAPH_TARGET_CHARS`]. Paragraphs of five words or fewer are
/// dropped.
pub fn split_into_paragraphs(text: &str) -> Vec<String> {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");

    let mut paragraphs = Vec::new();
    let mut current = String::new();
    for sentence in split_sentences(&collapsed) {
        let sentence = sentence.trim();
        if sentence.is_empty() {
            continue;
        }
        if current.chars().count() >= PARAGRAPH_TARGET_CHARS {
            paragraphs.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(sentence);
    }
    if !current.is_empty() {
        paragraphs.push(current);
    }

    paragraphs.retain(|p| word_count(p) > MAX_DROPPED_WORDS);
    paragraphs
}

/// Fetch one essay and extract its paragraphs.
///
/// Failures are returned as [`ArticleContent::failed`], not as errors.
#[instrument(level = "info", skip(client))]
pub async fn extract_article(client: &Client, url: &str) -> ArticleContent {
    let extracted = async {
        let html = fetch_page(client, url).await?;
        extract_text(&html)
    }
    .await;

    match extracted {
        Ok(text) => {
            let paragraphs = split_into_paragraphs(&text);
            debug!(%url, paragraphs = paragraphs.len(), "Extracted article");
            ArticleContent::extracted(paragraphs, word_count(&text))
        }
        Err(e) => {
            warn!(%url, error = %e, "Article extraction failed");
            ArticleContent::failed(e.to_string())
        }
    }
}

/// Which index entries [`extract_all`] processes.
#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    /// Re-extract entries that already have a record.
    pub force: bool,
    /// Only the entry with this page filename (or storage key).
    pub only: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractReport {
    pub created: usize,
    pub skipped: usize,
    /// Extraction or write failures; failed extractions are still stored.
    pub failed: usize,
}

fn new_record(entry: &IndexEntry, content: ArticleContent) -> ArticleRecord {
    ArticleRecord {
        title: entry.title.clone(),
        title_zh: format!("{PENDING_MARKER} {}", entry.title),
        url: entry.url.clone(),
        filename: entry.filename.clone(),
        date: entry.date.clone(),
        id: entry.id,
        content: Some(content),
        paragraphs: None,
        translation_completed: None,
        translation_stats: None,
        processed_at: Some(now_iso()),
        extra: Map::new(),
    }
}

/// Create an article record for every index entry not yet stored.
///
/// Fetches run one at a time with `request_delay` between them and a longer
/// pause after every ten.
#[instrument(level = "info", skip_all, fields(entries = entries.len(), force = options.force))]
pub async fn extract_all<S: ArticleStore>(
    client: &Client,
    entries: &[IndexEntry],
    store: &S,
    site: &SiteSettings,
    options: &ExtractOptions,
) -> ExtractReport {
    let wanted = options.only.as_deref().map(store_key);
    let mut report = ExtractReport::default();
    let mut fetched = 0usize;

    for entry in entries {
        let key = store_key(&entry.filename);
        if wanted.as_ref().is_some_and(|w| *w != key) {
            continue;
        }
        if !options.force && store.contains(&key).await {
            debug!(%key, "Already extracted");
            report.skipped += 1;
            continue;
        }

        if fetched > 0 {
            let pause = if fetched % GROUP_SIZE == 0 { GROUP_PAUSE } else { site.request_delay() };
            if !pause.is_zero() {
                sleep(pause).await;
            }
        }
        fetched += 1;

        let content = extract_article(client, &entry.url).await;
        let extracted = content.success;
        let record = new_record(entry, content);
        match store.put(&record).await {
            Ok(()) if extracted => {
                info!(
                    %key,
                    paragraphs = record.content.as_ref().map_or(0, |c| c.paragraph_count),
                    "Article stored"
                );
                report.created += 1;
            }
            Ok(()) => report.failed += 1,
            Err(e) => {
                error!(%key, error = %e, "Failed to store article");
                report.failed += 1;
            }
        }
    }

    info!(
        created = report.created,
        skipped = report.skipped,
        failed = report.failed,
        "Extraction finished"
    );
    report
}
