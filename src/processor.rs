//! One translation pass over one article.
//!
//! A pass walks the source paragraphs in order and produces a `paragraphs`
//! list of the same length. Paragraphs of three words or fewer are copied
//! through without an API call. Everything else goes to the [`Translator`];
//! failures become placeholders and the pass carries on.
//!
//! A pass given a deadline stops translating once it passes and leaves the
//! rest as pending placeholders. The next pass over that record resumes: done
//! paragraphs are kept whatever the policy.

use crate::models::{ArticleRecord, Paragraph, ParagraphStatus, TranslationStats};
use crate::translator::{CompletionClient, Translator};
use crate::utils::{now_iso, word_count};
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, instrument, warn};

/// Paragraphs of three words or fewer are copied verbatim.
///
/// Fragments like "A short bit." must reach the output untouched and
/// without an API call, so the cut-off sits below four words.
pub const MIN_WORDS_TO_TRANSLATE: usize = 4;

/// What to do with paragraphs that are already done when an article is
/// translated again.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RetranslatePolicy {
    /// Translate every paragraph from the source again.
    #[default]
    WholeArticle,
    /// Keep done paragraphs whose original still matches the source.
    FailedOnly,
}

/// Output of [`translate_paragraphs`].
#[derive(Debug, Clone, PartialEq)]
pub struct PassResult {
    pub paragraphs: Vec<Paragraph>,
    /// Paragraphs with a real translation (passthroughs excluded).
    pub success_count: usize,
    pub api_calls: usize,
    pub reused: usize,
    /// The deadline passed before every paragraph was attempted.
    pub interrupted: bool,
}

impl PassResult {
    pub fn failed_count(&self) -> usize {
        self.paragraphs
            .iter()
            .filter(|p| !p.state().is_done())
            .count()
    }
}

pub fn is_passthrough(text: &str) -> bool {
    word_count(text) < MIN_WORDS_TO_TRANSLATE
}

/// A list left behind by a pass that ran out of time.
fn was_interrupted(previous: &[Paragraph]) -> bool {
    previous
        .iter()
        .any(|p| p.status == Some(ParagraphStatus::Pending))
}

/// Translate `source` paragraph by paragraph.
///
/// With [`RetranslatePolicy::FailedOnly`] and a `previous` list aligned with
/// `source`, done paragraphs are reused instead of sent again.
pub async fn translate_paragraphs<C: CompletionClient>(
    source: &[String],
    translator: &Translator<C>,
    policy: RetranslatePolicy,
    previous: Option<&[Paragraph]>,
) -> PassResult {
    translate_paragraphs_until(source, translator, policy, previous, None).await
}

/// [`translate_paragraphs`] that gives up at `deadline`.
///
/// An interrupted `previous` list (one holding pending paragraphs) is reused
/// as under [`RetranslatePolicy::FailedOnly`], so repeated runs converge.
#[instrument(level = "info", skip_all, fields(paragraphs = source.len(), ?policy))]
pub async fn translate_paragraphs_until<C: CompletionClient>(
    source: &[String],
    translator: &Translator<C>,
    policy: RetranslatePolicy,
    previous: Option<&[Paragraph]>,
    deadline: Option<Instant>,
) -> PassResult {
    let reusable = previous.filter(|prev| {
        prev.len() == source.len()
            && (policy == RetranslatePolicy::FailedOnly || was_interrupted(prev))
    });

    let total = source.len();
    let mut result = PassResult {
        paragraphs: Vec::with_capacity(total),
        success_count: 0,
        api_calls: 0,
        reused: 0,
        interrupted: false,
    };

    for (i, original) in source.iter().enumerate() {
        if is_passthrough(original) {
            debug!(index = i + 1, total, "Too short; kept as-is");
            result.paragraphs.push(Paragraph::passthrough(original));
            continue;
        }

        if let Some(prev) = reusable.map(|r| &r[i]) {
            if prev.original == *original && prev.state().is_done() {
                result.paragraphs.push(prev.clone());
                result.success_count += 1;
                result.reused += 1;
                continue;
            }
        }

        if result.interrupted || deadline.is_some_and(|d| Instant::now() >= d) {
            result.interrupted = true;
            result.paragraphs.push(Paragraph::pending(original));
            continue;
        }

        result.api_calls += 1;
        let outcome = match deadline {
            Some(d) => match timeout_at(d, translator.translate(original)).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    warn!(index = i + 1, total, "Deadline passed mid-paragraph");
                    result.interrupted = true;
                    result.paragraphs.push(Paragraph::pending(original));
                    continue;
                }
            },
            None => translator.translate(original).await,
        };
        if outcome.success {
            debug!(index = i + 1, total, "Paragraph translated");
            result.success_count += 1;
            result.paragraphs.push(Paragraph::translated(original, outcome.translated));
        } else {
            let reason = outcome.error.unwrap_or_else(|| "unknown error".to_string());
            warn!(index = i + 1, total, error = %reason, "Paragraph translation failed");
            result.paragraphs.push(Paragraph::failed(original, reason));
        }
    }

    info!(
        total,
        success = result.success_count,
        failed = result.failed_count(),
        api_calls = result.api_calls,
        reused = result.reused,
        interrupted = result.interrupted,
        "Translation pass finished"
    );
    result
}

/// Store a pass on the record and stamp completion time and stats.
pub fn apply_pass(record: &mut ArticleRecord, pass: PassResult) -> TranslationStats {
    let stats = TranslationStats::new(pass.paragraphs.len(), pass.success_count);
    record.paragraphs = Some(pass.paragraphs);
    record.translation_completed = Some(now_iso());
    record.translation_stats = Some(stats.clone());
    stats
}
