//! Data models for the article index and the per-article records.
//!
//! This module defines the persisted JSON shapes:
//! - [`IndexEntry`]: one line of `articles.json`, produced by the list scraper
//! - [`ArticleRecord`]: one file under `processed/`, one per article
//! - [`ArticleContent`]: the extraction result embedded in a record
//! - [`Paragraph`]: one original paragraph and its translation
//! - [`TranslationStats`]: summary of the most recent translation pass
//!
//! Field names match the files written by earlier tooling, so existing data
//! directories load unchanged. Keys this crate does not know about are kept
//! in [`ArticleRecord::extra`] and written back as they were.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Date value used when no publication date could be found.
pub const UNKNOWN_DATE: &str = "Unknown";

/// An entry in the article index file.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct IndexEntry {
    pub title: String,
    pub url: String,
    /// Page name on the source site, e.g. `"greatwork.html"`.
    pub filename: String,
    /// `YYYY-MM-DD` or [`UNKNOWN_DATE`].
    pub date: String,
    /// 1-based position in date-descending order.
    #[serde(default)]
    pub id: u32,
}

/// Text extracted from an article page.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct ArticleContent {
    pub success: bool,
    /// Absent when extraction never produced a paragraph list.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paragraphs: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub word_count: usize,
    #[serde(default)]
    pub paragraph_count: usize,
}

impl ArticleContent {
    pub fn extracted(paragraphs: Vec<String>, word_count: usize) -> Self {
        Self {
            success: true,
            paragraph_count: paragraphs.len(),
            paragraphs: Some(paragraphs),
            error: None,
            word_count,
        }
    }

    /// Extraction failed; paragraphs are recorded as empty.
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            paragraphs: Some(Vec::new()),
            error: Some(error.into()),
            word_count: 0,
            paragraph_count: 0,
        }
    }
}

/// Explicit translation state written alongside `translated`.
///
/// Files produced by older tooling carry no status; those are classified
/// from the `translated` text (see [`crate::state`]).
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ParagraphStatus {
    Pending,
    Done,
    Failed { reason: String },
}

/// One paragraph of an article and its translation.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Paragraph {
    pub original: String,
    #[serde(default)]
    pub translated: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ParagraphStatus>,
}

/// Summary of the last translation pass over an article.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct TranslationStats {
    pub total_paragraphs: usize,
    /// Paragraphs translated by the API; passthroughs are not counted.
    pub success_count: usize,
    /// Percentage with one decimal, e.g. `"87.5%"`.
    pub success_rate: String,
}

impl TranslationStats {
    pub fn new(total_paragraphs: usize, success_count: usize) -> Self {
        let rate = if total_paragraphs == 0 {
            0.0
        } else {
            success_count as f64 / total_paragraphs as f64 * 100.0
        };
        Self {
            total_paragraphs,
            success_count,
            success_rate: format!("{rate:.1}%"),
        }
    }
}

/// A processed article as stored in `processed/<slug>.json`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ArticleRecord {
    pub title: String,
    #[serde(default)]
    pub title_zh: String,
    pub url: String,
    pub filename: String,
    #[serde(default = "unknown_date")]
    pub date: String,
    #[serde(default)]
    pub id: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<ArticleContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paragraphs: Option<Vec<Paragraph>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation_completed: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub translation_stats: Option<TranslationStats>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn unknown_date() -> String {
    UNKNOWN_DATE.to_string()
}

impl ArticleRecord {
    /// Storage key for this record, derived from the page filename.
    pub fn key(&self) -> String {
        store_key(&self.filename)
    }

    /// The paragraphs a translation pass works from.
    ///
    /// `content.paragraphs` when extraction ran; otherwise the originals of an
    /// older record that only kept `paragraphs`. `None` means there is nothing
    /// to translate.
    pub fn source_paragraphs(&self) -> Option<Vec<String>> {
        if let Some(source) = self.content.as_ref().and_then(|c| c.paragraphs.as_ref()) {
            return Some(source.clone());
        }
        match &self.paragraphs {
            Some(existing) if !existing.is_empty() => {
                Some(existing.iter().map(|p| p.original.clone()).collect())
            }
            _ => None,
        }
    }
}

/// Map a source page name to its storage key: `essay.html` -> `essay.json`.
pub fn store_key(filename: &str) -> String {
    match filename.strip_suffix(".html") {
        Some(stem) => format!("{stem}.json"),
        None if filename.ends_with(".json") => filename.to_string(),
        None => format!("{filename}.json"),
    }
}
