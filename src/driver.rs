//! Batch driver: select articles by status, translate, persist, repeat.
//!
//! The driver is strictly sequential. Each selected article is read from the
//! store, translated in one pass, and written back before the next one is
//! touched, so an interrupted run loses at most the article in flight.
//! Retrying is a matter of running again: selection re-reads the store and
//! only picks articles that are not yet complete.
//!
//! # Selection
//!
//! | Selection | Picks |
//! |-----------|-------|
//! | [`Selection::FirstPass`] | untranslated articles |
//! | [`Selection::RetryFailures`] | untranslated and partial articles |
//! | [`Selection::Single`] | exactly one article, unless already complete |

use crate::config::BatchSettings;
use crate::error::DriverError;
use crate::models::{store_key, TranslationStats};
use crate::processor::{apply_pass, translate_paragraphs_until, RetranslatePolicy};
use crate::state::{classify, ArticleStatus, StatusKind};
use crate::store::ArticleStore;
use crate::translator::{CompletionClient, Translator};
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tracing::{error, info, instrument, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    FirstPass,
    RetryFailures,
    /// One storage key; `.json` is appended when missing.
    Single(String),
}

impl Selection {
    fn statuses(&self) -> &'static [StatusKind] {
        match self {
            Selection::FirstPass => &[StatusKind::Untranslated],
            Selection::RetryFailures | Selection::Single(_) => {
                &[StatusKind::Untranslated, StatusKind::Partial]
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct BatchOptions {
    pub selection: Selection,
    pub policy: RetranslatePolicy,
    /// Selection passes over the store; each pass re-reads statuses.
    pub max_rounds: usize,
    pub max_articles: Option<usize>,
    pub time_budget: Option<Duration>,
    pub article_pause: Duration,
    pub round_pause: Duration,
    /// Deadline for one article's pass. Paragraphs finished in time are
    /// saved and the next run picks up the rest.
    pub article_timeout: Option<Duration>,
}

impl BatchOptions {
    pub fn from_settings(selection: Selection, settings: &BatchSettings) -> Self {
        Self {
            selection,
            policy: RetranslatePolicy::default(),
            max_rounds: 1,
            max_articles: None,
            time_budget: None,
            article_pause: Duration::from_millis(settings.article_pause_ms),
            round_pause: Duration::from_millis(settings.round_pause_ms),
            article_timeout: settings.article_timeout_secs.map(Duration::from_secs),
        }
    }
}

/// Totals for one driver run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub rounds: usize,
    pub attempted: usize,
    /// Articles translated and saved, even if some paragraphs failed.
    pub succeeded: usize,
    /// Articles that timed out or could not be read or saved.
    pub failed: usize,
    /// Articles that were already complete or had nothing to translate.
    pub skipped: usize,
    /// Articles that ended the run fully translated.
    pub completed: usize,
}

/// Result of processing one article.
#[derive(Debug, Clone, PartialEq)]
pub enum ArticleOutcome {
    Translated {
        stats: TranslationStats,
        status: ArticleStatus,
    },
    AlreadyComplete,
    NoSource,
}

pub struct BatchDriver<'a, S, C> {
    store: &'a S,
    translator: &'a Translator<C>,
    options: BatchOptions,
}

impl<'a, S: ArticleStore, C: CompletionClient> BatchDriver<'a, S, C> {
    pub fn new(store: &'a S, translator: &'a Translator<C>, options: BatchOptions) -> Self {
        Self {
            store,
            translator,
            options,
        }
    }

    /// Run until nothing qualifies or a budget runs out.
    #[instrument(level = "info", skip_all, fields(selection = ?self.options.selection))]
    pub async fn run(&self) -> Result<BatchReport, DriverError> {
        if let Selection::Single(target) = &self.options.selection {
            return self.run_single(&store_key(target)).await;
        }

        let started = Instant::now();
        let mut report = BatchReport::default();

        'rounds: while report.rounds < self.options.max_rounds {
            let keys = self.candidates().await?;
            if keys.is_empty() {
                info!("No articles left to translate");
                break;
            }
            report.rounds += 1;
            info!(round = report.rounds, count = keys.len(), "Selected articles");

            for (i, key) in keys.iter().enumerate() {
                if let Some(reason) = self.budget_exhausted(&report, started) {
                    info!(reason, "Stopping batch");
                    break 'rounds;
                }
                if i > 0 && !self.options.article_pause.is_zero() {
                    sleep(self.options.article_pause).await;
                }

                report.attempted += 1;
                info!(progress = %format!("{}/{}", i + 1, keys.len()), %key, "Translating article");
                self.record_outcome(&mut report, key, self.process_article(key).await);
                info!(
                    attempted = report.attempted,
                    succeeded = report.succeeded,
                    failed = report.failed,
                    "Progress"
                );
            }

            if report.rounds < self.options.max_rounds && !self.options.round_pause.is_zero() {
                sleep(self.options.round_pause).await;
            }
        }

        info!(
            rounds = report.rounds,
            attempted = report.attempted,
            succeeded = report.succeeded,
            failed = report.failed,
            skipped = report.skipped,
            completed = report.completed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Batch finished"
        );
        Ok(report)
    }

    /// Translate the article whose `id` field (or key stem) is `id`.
    pub async fn run_for_id(&self, id: &str) -> Result<BatchReport, DriverError> {
        let record = self.store.find_by_id(id).await?;
        self.run_single(&record.key()).await
    }

    async fn run_single(&self, key: &str) -> Result<BatchReport, DriverError> {
        let mut report = BatchReport {
            rounds: 1,
            attempted: 1,
            ..BatchReport::default()
        };
        // Read errors reject the run; save errors and timeouts are reported.
        match self.process_article(key).await {
            Ok(ArticleOutcome::NoSource) => {
                return Err(DriverError::NoSourceParagraphs(key.to_string()));
            }
            Err(DriverError::Store(e)) => return Err(DriverError::Store(e)),
            outcome => self.record_outcome(&mut report, key, outcome),
        }
        Ok(report)
    }

    /// Keys matching the selection that have something to translate.
    pub async fn candidates(&self) -> Result<Vec<String>, DriverError> {
        let mut keys = Vec::new();
        for key in self
            .store
            .list_by_status(self.options.selection.statuses())
            .await?
        {
            match self.store.get(&key).await {
                Ok(record) if record.source_paragraphs().is_some_and(|s| !s.is_empty()) => {
                    keys.push(key)
                }
                Ok(_) => warn!(%key, "No source paragraphs; skipping"),
                Err(e) => warn!(%key, error = %e, "Skipping unreadable article"),
            }
        }
        Ok(keys)
    }

    fn budget_exhausted(&self, report: &BatchReport, started: Instant) -> Option<&'static str> {
        if self
            .options
            .max_articles
            .is_some_and(|max| report.attempted >= max)
        {
            return Some("article limit reached");
        }
        if self
            .options
            .time_budget
            .is_some_and(|budget| started.elapsed() >= budget)
        {
            return Some("time budget exhausted");
        }
        None
    }

    fn record_outcome(
        &self,
        report: &mut BatchReport,
        key: &str,
        outcome: Result<ArticleOutcome, DriverError>,
    ) {
        match outcome {
            Ok(ArticleOutcome::Translated { stats, status }) => {
                report.succeeded += 1;
                if status == ArticleStatus::Complete {
                    report.completed += 1;
                }
                info!(
                    %key,
                    success = stats.success_count,
                    total = stats.total_paragraphs,
                    rate = %stats.success_rate,
                    "Saved translation"
                );
            }
            Ok(ArticleOutcome::AlreadyComplete) => {
                report.skipped += 1;
                report.completed += 1;
                info!(%key, "Already translated; skipping");
            }
            Ok(ArticleOutcome::NoSource) => {
                report.skipped += 1;
                warn!(%key, "No source paragraphs; skipping");
            }
            Err(e) => {
                report.failed += 1;
                error!(%key, error = %e, "Article failed");
            }
        }
    }

    /// Read, translate, and save one article.
    ///
    /// A pass cut short by the article timeout is still saved, then reported
    /// as [`DriverError::Timeout`].
    #[instrument(level = "info", skip(self))]
    pub async fn process_article(&self, key: &str) -> Result<ArticleOutcome, DriverError> {
        let deadline = self.options.article_timeout.map(|t| Instant::now() + t);
        let mut record = self.store.get(key).await?;
        if classify(&record) == ArticleStatus::Complete {
            return Ok(ArticleOutcome::AlreadyComplete);
        }
        let source = match record.source_paragraphs() {
            Some(source) if !source.is_empty() => source,
            _ => return Ok(ArticleOutcome::NoSource),
        };

        let pass = translate_paragraphs_until(
            &source,
            self.translator,
            self.options.policy,
            record.paragraphs.as_deref(),
            deadline,
        )
        .await;
        let interrupted = pass.interrupted;
        let stats = apply_pass(&mut record, pass);
        self.store
            .put(&record)
            .await
            .map_err(|source| DriverError::Save {
                key: key.to_string(),
                source,
            })?;
        if interrupted {
            return Err(DriverError::Timeout(key.to_string()));
        }

        Ok(ArticleOutcome::Translated {
            stats,
            status: classify(&record),
        })
    }
}
