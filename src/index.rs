//! The article index file, `<data_dir>/articles.json`.
//!
//! The index lists every essay on the site, newest first. Essays without a
//! usable date sort after all dated ones, in the order they were found.

use crate::error::StoreError;
use crate::models::{IndexEntry, UNKNOWN_DATE};
use crate::scrapers::dates::parse_stored_date;
use itertools::Itertools;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, instrument, warn};

pub fn index_path(data_dir: &Path) -> PathBuf {
    data_dir.join("articles.json")
}

#[instrument(level = "info", skip_all, fields(data_dir = %data_dir.display()))]
pub async fn load_index(data_dir: &Path) -> Result<Vec<IndexEntry>, StoreError> {
    let path = index_path(data_dir);
    let raw = fs::read_to_string(&path).await.map_err(|source| {
        if source.kind() == ErrorKind::NotFound {
            StoreError::NotFound(path.display().to_string())
        } else {
            StoreError::Io {
                path: path.clone(),
                source,
            }
        }
    })?;
    let entries: Vec<IndexEntry> =
        serde_json::from_str(&raw).map_err(|source| StoreError::Json { path, source })?;
    info!(count = entries.len(), "Loaded article index");
    Ok(entries)
}

#[instrument(level = "info", skip_all, fields(data_dir = %data_dir.display(), count = entries.len()))]
pub async fn save_index(data_dir: &Path, entries: &[IndexEntry]) -> Result<(), StoreError> {
    let path = index_path(data_dir);
    let json = serde_json::to_string_pretty(entries).map_err(|source| StoreError::Json {
        path: path.clone(),
        source,
    })?;
    let tmp = path.with_extension("json.tmp");
    let io_err = |source| StoreError::Io {
        path: path.clone(),
        source,
    };
    fs::write(&tmp, json).await.map_err(io_err)?;
    fs::rename(&tmp, &path).await.map_err(io_err)?;
    info!(path = %path.display(), "Wrote article index");
    Ok(())
}

/// Sort entries newest first and renumber ids from 1.
///
/// Dates that do not parse as `YYYY-MM-DD`, or fall outside the plausible
/// range, are rewritten to [`UNKNOWN_DATE`] and moved to the end.
pub fn order_index(entries: Vec<IndexEntry>) -> Vec<IndexEntry> {
    let (mut dated, mut unknown): (Vec<_>, Vec<_>) = entries
        .into_iter()
        .map(|entry| (parse_stored_date(&entry.date), entry))
        .partition(|(date, _)| date.is_some());

    for (_, entry) in unknown.iter_mut() {
        if entry.date != UNKNOWN_DATE {
            warn!(title = %entry.title, date = %entry.date, "Discarding invalid date");
            entry.date = UNKNOWN_DATE.to_string();
        }
    }
    info!(dated = dated.len(), unknown = unknown.len(), "Ordering article index");

    dated.sort_by(|(a, _), (b, _)| b.cmp(a));
    dated
        .into_iter()
        .chain(unknown)
        .map(|(_, entry)| entry)
        .enumerate()
        .map(|(i, mut entry)| {
            entry.id = i as u32 + 1;
            entry
        })
        .collect_vec()
}
