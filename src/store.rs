//! Article store: one JSON document per article.
//!
//! [`ArticleStore`] is the seam between the translation state machine and
//! persistence. [`JsonDirStore`] keeps records as pretty-printed files under
//! `<data_dir>/processed/`, keyed by the page slug (`essay.json`).
//!
//! Writes go to a sibling `.tmp` file that is then renamed over the target,
//! so an interrupted or failed write leaves the previous version intact.
//! There is no locking; one process is expected to own the directory.

use crate::error::StoreError;
use crate::models::ArticleRecord;
use crate::state::{classify, StatusKind};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, instrument, warn};

/// Repository of article records.
pub trait ArticleStore {
    /// Load the record stored under `key`.
    async fn get(&self, key: &str) -> Result<ArticleRecord, StoreError>;

    /// Insert or replace a record under [`ArticleRecord::key`].
    async fn put(&self, record: &ArticleRecord) -> Result<(), StoreError>;

    /// All keys in lexicographic order.
    async fn list(&self) -> Result<Vec<String>, StoreError>;

    async fn contains(&self, key: &str) -> bool {
        self.get(key).await.is_ok()
    }

    /// Keys whose current status is one of `statuses`, in key order.
    ///
    /// Records that cannot be read are logged and left out.
    async fn list_by_status(&self, statuses: &[StatusKind]) -> Result<Vec<String>, StoreError> {
        let mut keys = Vec::new();
        for key in self.list().await? {
            match self.get(&key).await {
                Ok(record) => {
                    if statuses.contains(&classify(&record).kind()) {
                        keys.push(key);
                    }
                }
                Err(e) => warn!(%key, error = %e, "Skipping unreadable article"),
            }
        }
        Ok(keys)
    }

    /// Find a record by its numeric `id`, falling back to the key `<id>.json`.
    async fn find_by_id(&self, id: &str) -> Result<ArticleRecord, StoreError> {
        if let Ok(wanted) = id.parse::<u32>() {
            for key in self.list().await? {
                if let Ok(record) = self.get(&key).await {
                    if record.id == wanted {
                        return Ok(record);
                    }
                }
            }
        }
        self.get(&format!("{id}.json"))
            .await
            .map_err(|_| StoreError::NotFound(id.to_string()))
    }
}

/// Filesystem-backed store.
#[derive(Debug, Clone)]
pub struct JsonDirStore {
    dir: PathBuf,
}

impl JsonDirStore {
    /// Store rooted at `<data_dir>/processed`.
    pub fn new(data_dir: &Path) -> Self {
        Self {
            dir: data_dir.join("processed"),
        }
    }

    /// Like [`JsonDirStore::new`], creating the directory if needed.
    pub async fn open(data_dir: &Path) -> Result<Self, StoreError> {
        let store = Self::new(data_dir);
        fs::create_dir_all(&store.dir)
            .await
            .map_err(|source| StoreError::Io {
                path: store.dir.clone(),
                source,
            })?;
        Ok(store)
    }

    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }
}

impl ArticleStore for JsonDirStore {
    #[instrument(level = "debug", skip(self))]
    async fn get(&self, key: &str) -> Result<ArticleRecord, StoreError> {
        let path = self.path_for(key);
        let raw = fs::read_to_string(&path).await.map_err(|source| {
            if source.kind() == ErrorKind::NotFound {
                StoreError::NotFound(key.to_string())
            } else {
                StoreError::Io {
                    path: path.clone(),
                    source,
                }
            }
        })?;
        serde_json::from_str(&raw).map_err(|source| StoreError::Json { path, source })
    }

    #[instrument(level = "debug", skip_all, fields(key = %record.key()))]
    async fn put(&self, record: &ArticleRecord) -> Result<(), StoreError> {
        let path = self.path_for(&record.key());
        let json = serde_json::to_string_pretty(record).map_err(|source| StoreError::Json {
            path: path.clone(),
            source,
        })?;

        let tmp = path.with_extension("json.tmp");
        let io_err = |source| StoreError::Io {
            path: path.clone(),
            source,
        };
        fs::write(&tmp, json).await.map_err(io_err)?;
        if let Err(e) = fs::rename(&tmp, &path).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(io_err(e));
        }
        debug!(path = %path.display(), "Saved article");
        Ok(())
    }

    async fn contains(&self, key: &str) -> bool {
        fs::try_exists(self.path_for(key)).await.unwrap_or(false)
    }

    async fn list(&self) -> Result<Vec<String>, StoreError> {
        let io_err = |source| StoreError::Io {
            path: self.dir.clone(),
            source,
        };
        let mut entries = fs::read_dir(&self.dir).await.map_err(io_err)?;
        let mut keys = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(io_err)? {
            if let Some(name) = entry.file_name().to_str() {
                if name.ends_with(".json") {
                    keys.push(name.to_string());
                }
            }
        }
        keys.sort();
        Ok(keys)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::{ArticleContent, Paragraph};
    use serde_json::Map;

    pub(crate) fn sample_record(slug: &str, id: u32, source: Vec<&str>) -> ArticleRecord {
        ArticleRecord {
            title: format!("Essay {slug}"),
            title_zh: format!("[待翻译] Essay {slug}"),
            url: format!("https://www.paulgraham.com/{slug}.html"),
            filename: format!("{slug}.html"),
            date: "2021-03-01".into(),
            id,
            content: Some(ArticleContent::extracted(
                source.into_iter().map(String::from).collect(),
                0,
            )),
            paragraphs: None,
            translation_completed: None,
            translation_stats: None,
            processed_at: None,
            extra: Map::new(),
        }
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonDirStore::open(dir.path()).await.unwrap();
        let record = sample_record("alpha", 1, vec!["one two three four"]);
        store.put(&record).await.unwrap();

        let loaded = store.get("alpha.json").await.unwrap();
        assert_eq!(loaded, record);
        assert!(!store.path_for("alpha.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_written_json_is_pretty_and_unescaped() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonDirStore::open(dir.path()).await.unwrap();
        store.put(&sample_record("alpha", 1, vec![])).await.unwrap();
        let raw = std::fs::read_to_string(store.path_for("alpha.json")).unwrap();
        assert!(raw.contains("\n  \"title\""));
        assert!(raw.contains("[待翻译] Essay alpha"));
    }

    #[tokio::test]
    async fn test_get_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonDirStore::open(dir.path()).await.unwrap();
        assert!(matches!(store.get("nope.json").await, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_is_sorted_and_json_only() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonDirStore::open(dir.path()).await.unwrap();
        for slug in ["gamma", "alpha", "beta"] {
            store.put(&sample_record(slug, 1, vec![])).await.unwrap();
        }
        std::fs::write(store.path_for("notes.txt"), "x").unwrap();
        assert_eq!(
            store.list().await.unwrap(),
            vec!["alpha.json", "beta.json", "gamma.json"]
        );
    }

    #[tokio::test]
    async fn test_list_by_status_skips_corrupt_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonDirStore::open(dir.path()).await.unwrap();

        let fresh = sample_record("fresh", 1, vec!["one two three four"]);
        let mut done = sample_record("done", 2, vec!["one two three four"]);
        done.paragraphs = Some(vec![Paragraph::translated("one two three four", "一二三四".into())]);
        store.put(&fresh).await.unwrap();
        store.put(&done).await.unwrap();
        std::fs::write(store.path_for("broken.json"), "{ not json").unwrap();

        let untranslated = store.list_by_status(&[StatusKind::Untranslated]).await.unwrap();
        assert_eq!(untranslated, vec!["fresh.json"]);
        let complete = store.list_by_status(&[StatusKind::Complete]).await.unwrap();
        assert_eq!(complete, vec!["done.json"]);
    }

    #[tokio::test]
    async fn test_find_by_id_then_by_key() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonDirStore::open(dir.path()).await.unwrap();
        store.put(&sample_record("alpha", 7, vec![])).await.unwrap();
        store.put(&sample_record("field", 8, vec![])).await.unwrap();

        assert_eq!(store.find_by_id("7").await.unwrap().filename, "alpha.html");
        assert_eq!(store.find_by_id("field").await.unwrap().id, 8);
        assert!(matches!(store.find_by_id("99").await, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_failed_write_keeps_previous_version() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonDirStore::open(dir.path()).await.unwrap();
        let record = sample_record("alpha", 1, vec!["one two three four"]);
        store.put(&record).await.unwrap();

        // A directory squatting on the temp path makes the write fail.
        std::fs::create_dir(store.path_for("alpha.json.tmp")).unwrap();
        let mut changed = record.clone();
        changed.title = "Changed".into();
        assert!(store.put(&changed).await.is_err());

        assert_eq!(store.get("alpha.json").await.unwrap().title, "Essay alpha");
    }
}
