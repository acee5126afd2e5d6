//! Translation state of paragraphs and articles.
//!
//! Every paragraph is in exactly one of three states:
//! - **Pending**: never translated (empty, or a `[待翻译]` placeholder)
//! - **Failed**: the last attempt failed (`[翻译失败]` placeholder)
//! - **Done**: anything else, including short paragraphs copied verbatim
//!
//! A translation that starts with a marker is never `Done`. Past that,
//! paragraphs written by this crate carry an explicit [`ParagraphStatus`], so
//! a translation that merely quotes a marker is still `Done`. Paragraphs
//! from older files have no status and are classified from the text.
//!
//! Articles roll up to [`ArticleStatus`]: `Complete` when every paragraph is
//! done, `Untranslated` when none is (or no translation ever ran), and
//! `Partial` otherwise.

use crate::models::{ArticleRecord, Paragraph, ParagraphStatus};
use crate::utils::excerpt;

/// Prefix of a placeholder for a paragraph that was never translated.
pub const PENDING_MARKER: &str = "[待翻译]";
/// Prefix of a placeholder for a paragraph whose translation failed.
pub const FAILED_MARKER: &str = "[翻译失败]";

/// Characters of the original kept in a placeholder.
pub const EXCERPT_CHARS: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParagraphState {
    Pending,
    Failed,
    Done,
}

impl ParagraphState {
    pub fn is_done(self) -> bool {
        self == ParagraphState::Done
    }
}

/// Classify a `translated` string by its markers.
///
/// Empty first, then prefixes, then a marker anywhere in the text. Matching
/// is case-sensitive and byte-exact.
pub fn classify_text(translated: &str) -> ParagraphState {
    if translated.is_empty() {
        return ParagraphState::Pending;
    }
    if translated.starts_with(PENDING_MARKER) {
        return ParagraphState::Pending;
    }
    if translated.starts_with(FAILED_MARKER) {
        return ParagraphState::Failed;
    }
    if translated.contains(FAILED_MARKER) {
        return ParagraphState::Failed;
    }
    if translated.contains(PENDING_MARKER) {
        return ParagraphState::Pending;
    }
    ParagraphState::Done
}

/// `"[待翻译] <text>"`, truncated with `...` past [`EXCERPT_CHARS`].
pub fn pending_placeholder(text: &str) -> String {
    if text.chars().count() > EXCERPT_CHARS {
        format!("{PENDING_MARKER} {}...", excerpt(text, EXCERPT_CHARS))
    } else {
        format!("{PENDING_MARKER} {text}")
    }
}

/// `"[翻译失败] <first 50 chars>..."`.
pub fn failure_placeholder(text: &str) -> String {
    format!("{FAILED_MARKER} {}...", excerpt(text, EXCERPT_CHARS))
}

impl Paragraph {
    /// Short paragraph kept as-is.
    pub fn passthrough(original: &str) -> Self {
        Self {
            original: original.to_string(),
            translated: original.to_string(),
            status: Some(ParagraphStatus::Done),
        }
    }

    pub fn translated(original: &str, translated: String) -> Self {
        Self {
            original: original.to_string(),
            translated,
            status: Some(ParagraphStatus::Done),
        }
    }

    /// Not translated yet; the previous pass stopped before reaching it.
    pub fn pending(original: &str) -> Self {
        Self {
            original: original.to_string(),
            translated: pending_placeholder(original),
            status: Some(ParagraphStatus::Pending),
        }
    }

    pub fn failed(original: &str, reason: String) -> Self {
        Self {
            original: original.to_string(),
            translated: failure_placeholder(original),
            status: Some(ParagraphStatus::Failed { reason }),
        }
    }

    /// Current state of this paragraph.
    ///
    /// Empty text and marker prefixes decide first; an explicit status only
    /// overrides markers found later in the text.
    pub fn state(&self) -> ParagraphState {
        if self.translated.is_empty() || self.translated.starts_with(PENDING_MARKER) {
            return ParagraphState::Pending;
        }
        if self.translated.starts_with(FAILED_MARKER) {
            return ParagraphState::Failed;
        }
        match &self.status {
            Some(ParagraphStatus::Done) => ParagraphState::Done,
            Some(ParagraphStatus::Pending) => ParagraphState::Pending,
            Some(ParagraphStatus::Failed { .. }) => ParagraphState::Failed,
            None => classify_text(&self.translated),
        }
    }
}

/// Coarse status used to select articles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusKind {
    Untranslated,
    Partial,
    Complete,
}

/// Article-level translation status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArticleStatus {
    Untranslated,
    /// `unfinished` of `total` paragraphs are pending or failed.
    Partial { unfinished: usize, total: usize },
    Complete,
}

impl ArticleStatus {
    pub fn kind(self) -> StatusKind {
        match self {
            ArticleStatus::Untranslated => StatusKind::Untranslated,
            ArticleStatus::Partial { .. } => StatusKind::Partial,
            ArticleStatus::Complete => StatusKind::Complete,
        }
    }
}

/// Classify an article from its `paragraphs`.
///
/// A record with no paragraphs yet (absent or empty) is `Untranslated`;
/// whether there is anything to translate is a separate question answered by
/// [`ArticleRecord::source_paragraphs`].
pub fn classify(record: &ArticleRecord) -> ArticleStatus {
    let paragraphs = record.paragraphs.as_deref().unwrap_or_default();
    let total = paragraphs.len();
    let done = paragraphs.iter().filter(|p| p.state().is_done()).count();

    if total > 0 && done == total {
        ArticleStatus::Complete
    } else if done == 0 {
        ArticleStatus::Untranslated
    } else {
        ArticleStatus::Partial {
            unfinished: total - done,
            total,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ArticleContent;
    use serde_json::Map;

    fn legacy(original: &str, translated: &str) -> Paragraph {
        Paragraph {
            original: original.to_string(),
            translated: translated.to_string(),
            status: None,
        }
    }

    fn record(paragraphs: Option<Vec<Paragraph>>, source: Option<Vec<&str>>) -> ArticleRecord {
        ArticleRecord {
            title: "Essay".into(),
            title_zh: "[待翻译] Essay".into(),
            url: "https://example.com/essay.html".into(),
            filename: "essay.html".into(),
            date: "2020-01-01".into(),
            id: 1,
            content: source.map(|s| {
                ArticleContent::extracted(s.into_iter().map(String::from).collect(), 0)
            }),
            paragraphs,
            translation_completed: None,
            translation_stats: None,
            processed_at: None,
            extra: Map::new(),
        }
    }

    #[test]
    fn test_classify_text_precedence() {
        assert_eq!(classify_text(""), ParagraphState::Pending);
        assert_eq!(classify_text("[待翻译] Some text..."), ParagraphState::Pending);
        assert_eq!(classify_text("[翻译失败] Some text..."), ParagraphState::Failed);
        assert_eq!(classify_text("前文 [翻译失败] 后文"), ParagraphState::Failed);
        assert_eq!(classify_text("前文 [待翻译] 后文"), ParagraphState::Pending);
        assert_eq!(classify_text("正常的译文。"), ParagraphState::Done);
    }

    #[test]
    fn test_pending_prefix_never_done_even_with_other_text() {
        for s in ["[待翻译] ok", "[待翻译]", "[待翻译] 已翻译 [翻译失败]"] {
            assert!(!classify_text(s).is_done(), "{s}");
        }
    }

    #[test]
    fn test_marker_matching_is_exact() {
        assert_eq!(classify_text("[待 翻译] x"), ParagraphState::Done);
        assert_eq!(classify_text("【翻译失败】 x"), ParagraphState::Done);
    }

    #[test]
    fn test_explicit_status_overrides_markers() {
        let mut p = Paragraph::translated("a b c", "这段话提到了 [翻译失败] 这个标记".into());
        assert_eq!(p.state(), ParagraphState::Done);
        p.status = None;
        assert_eq!(p.state(), ParagraphState::Failed);
    }

    #[test]
    fn test_empty_translation_is_pending_even_with_status() {
        let p = Paragraph::translated("a b c", String::new());
        assert_eq!(p.state(), ParagraphState::Pending);
    }

    #[test]
    fn test_placeholders() {
        let long = "x".repeat(80);
        assert_eq!(pending_placeholder("short"), "[待翻译] short");
        assert_eq!(pending_placeholder(&long), format!("[待翻译] {}...", "x".repeat(50)));
        assert_eq!(failure_placeholder("short"), "[翻译失败] short...");
        assert_eq!(failure_placeholder(&long), format!("[翻译失败] {}...", "x".repeat(50)));
    }

    #[test]
    fn test_failure_placeholder_counts_characters() {
        let text = "翻".repeat(60);
        let placeholder = failure_placeholder(&text);
        assert_eq!(placeholder, format!("[翻译失败] {}...", "翻".repeat(50)));
    }

    #[test]
    fn test_constructed_paragraph_states() {
        assert_eq!(Paragraph::passthrough("Hi there").state(), ParagraphState::Done);
        assert_eq!(Paragraph::pending("a b c d").state(), ParagraphState::Pending);
        let failed = Paragraph::failed("a b c d", "HTTP 500: boom".into());
        assert_eq!(failed.state(), ParagraphState::Failed);
        assert!(failed.translated.starts_with(FAILED_MARKER));
    }

    #[test]
    fn test_marker_prefix_beats_done_status() {
        let p = Paragraph::translated("one two three four", "[待翻译] one two three four".into());
        assert_eq!(p.state(), ParagraphState::Pending);
        let p = Paragraph::translated("one two three four", "[翻译失败] one two...".into());
        assert_eq!(p.state(), ParagraphState::Failed);
    }

    #[test]
    fn test_done_status_overrides_embedded_marker() {
        let p = Paragraph::translated("quote the tag", "文中提到 [待翻译] 标记".into());
        assert_eq!(p.state(), ParagraphState::Done);
        let legacy_text = Paragraph { status: None, ..p };
        assert_eq!(legacy_text.state(), ParagraphState::Pending);
    }

    #[test]
    fn test_classify_complete() {
        let r = record(
            Some(vec![legacy("a", "甲"), legacy("b c", "b c")]),
            Some(vec!["a", "b c"]),
        );
        assert_eq!(classify(&r), ArticleStatus::Complete);
    }

    #[test]
    fn test_classify_partial_counts_unfinished() {
        let r = record(
            Some(vec![
                legacy("a", "甲"),
                legacy("b", "[翻译失败] b..."),
                legacy("c", ""),
            ]),
            None,
        );
        assert_eq!(classify(&r), ArticleStatus::Partial { unfinished: 2, total: 3 });
    }

    #[test]
    fn test_classify_all_failed_is_untranslated() {
        let r = record(
            Some(vec![legacy("a", "[翻译失败] a..."), legacy("b", "[待翻译] b")]),
            None,
        );
        assert_eq!(classify(&r), ArticleStatus::Untranslated);
    }

    #[test]
    fn test_classify_absent_paragraphs_with_source() {
        let r = record(None, Some(vec!["one two three four"]));
        assert_eq!(classify(&r), ArticleStatus::Untranslated);
        assert!(r.source_paragraphs().is_some());
    }

    #[test]
    fn test_classify_empty_everything_has_no_source() {
        let r = record(Some(Vec::new()), None);
        assert_eq!(classify(&r), ArticleStatus::Untranslated);
        assert!(r.source_paragraphs().is_none());
    }

    #[test]
    fn test_status_kind() {
        assert_eq!(
            ArticleStatus::Partial { unfinished: 1, total: 2 }.kind(),
            StatusKind::Partial
        );
        assert_eq!(ArticleStatus::Complete.kind(), StatusKind::Complete);
    }
}
