//! Corpus-wide translation status report.

use crate::error::StoreError;
use crate::state::{ArticleStatus, classify};
use crate::store::ArticleStore;
use std::fmt;
use tracing::{instrument, warn};

/// Entries listed per bucket when the report is printed.
const LISTED_PER_BUCKET: usize = 10;

/// An article with some paragraphs still pending or failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartialArticle {
    pub key: String,
    pub unfinished: usize,
    pub total: usize,
}

/// Store keys grouped by article status, each in key order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusReport {
    pub untranslated: Vec<String>,
    pub partial: Vec<PartialArticle>,
    pub complete: Vec<String>,
}

impl StatusReport {
    /// Classify every readable record in the store.
    #[instrument(level = "info", skip_all)]
    pub async fn build<S: ArticleStore>(store: &S) -> Result<Self, StoreError> {
        let mut report = Self::default();
        for key in store.list().await? {
            let record = match store.get(&key).await {
                Ok(record) => record,
                Err(e) => {
                    warn!(%key, error = %e, "Skipping unreadable article");
                    continue;
                }
            };
            match classify(&record) {
                ArticleStatus::Untranslated => report.untranslated.push(key),
                ArticleStatus::Partial { unfinished, total } => report.partial.push(PartialArticle {
                    key,
                    unfinished,
                    total,
                }),
                ArticleStatus::Complete => report.complete.push(key),
            }
        }
        Ok(report)
    }

    pub fn total(&self) -> usize {
        self.untranslated.len() + self.partial.len() + self.complete.len()
    }
}

fn write_remaining(f: &mut fmt::Formatter<'_>, len: usize) -> fmt::Result {
    if len > LISTED_PER_BUCKET {
        writeln!(f, "  ... and {} more", len - LISTED_PER_BUCKET)?;
    }
    Ok(())
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Translation status:")?;
        writeln!(f, "- untranslated: {}", self.untranslated.len())?;
        writeln!(f, "- partially failed: {}", self.partial.len())?;
        writeln!(f, "- complete: {}", self.complete.len())?;
        writeln!(f, "- total: {}", self.total())?;

        if !self.untranslated.is_empty() {
            writeln!(f, "\nUntranslated ({}):", self.untranslated.len())?;
            for (i, key) in self.untranslated.iter().take(LISTED_PER_BUCKET).enumerate() {
                writeln!(f, "  {}. {key}", i + 1)?;
            }
            write_remaining(f, self.untranslated.len())?;
        }

        if !self.partial.is_empty() {
            writeln!(f, "\nPartially failed ({}):", self.partial.len())?;
            for (i, p) in self.partial.iter().take(LISTED_PER_BUCKET).enumerate() {
                writeln!(f, "  {}. {} ({}/{} paragraphs unfinished)", i + 1, p.key, p.unfinished, p.total)?;
            }
            write_remaining(f, self.partial.len())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Paragraph;
    use crate::store::JsonDirStore;
    use crate::store::tests::sample_record;

    const LONG: &str = "A paragraph long enough to need a real translation.";

    #[tokio::test]
    async fn test_build_groups_by_status() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonDirStore::open(dir.path()).await.unwrap();

        store.put(&sample_record("fresh", 1, vec![LONG])).await.unwrap();

        let mut partial = sample_record("half", 2, vec![LONG, LONG]);
        partial.paragraphs = Some(vec![
            Paragraph::translated(LONG, "译文".into()),
            Paragraph::failed(LONG, "HTTP 500".into()),
        ]);
        store.put(&partial).await.unwrap();

        let mut done = sample_record("done", 3, vec![LONG]);
        done.paragraphs = Some(vec![Paragraph::translated(LONG, "译文".into())]);
        store.put(&done).await.unwrap();

        tokio::fs::write(dir.path().join("processed/broken.json"), "{")
            .await
            .unwrap();

        let report = StatusReport::build(&store).await.unwrap();
        assert_eq!(report.untranslated, ["fresh.json"]);
        assert_eq!(
            report.partial,
            [PartialArticle { key: "half.json".into(), unfinished: 1, total: 2 }]
        );
        assert_eq!(report.complete, ["done.json"]);
        assert_eq!(report.total(), 3);
    }

    #[test]
    fn test_display_lists_first_ten() {
        let report = StatusReport {
            untranslated: (1..=12).map(|i| format!("essay{i:02}.json")).collect(),
            partial: vec![PartialArticle { key: "half.json".into(), unfinished: 3, total: 8 }],
            complete: vec!["done.json".into()],
        };
        let text = report.to_string();
        assert!(text.contains("- total: 14"));
        assert!(text.contains("10. essay10.json"));
        assert!(!text.contains("essay11.json"));
        assert!(text.contains("... and 2 more"));
        assert!(text.contains("1. half.json (3/8 paragraphs unfinished)"));
    }
}
