//! Utility functions for text slicing, timestamps, and file system checks.
//!
//! This module provides helpers used throughout the application:
//! - Character-safe excerpts and log truncation
//! - Word counting for the passthrough rule
//! - Local timestamps in the format stored in article records
//! - Data directory validation before a run starts

use chrono::Local;
use std::error::Error;
use std::path::Path;
use tokio::fs;
use tracing::{info, instrument};

/// First `max` characters of `s`, never splitting a UTF-8 sequence.
pub fn excerpt(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Truncate a string for logging purposes.
///
/// Long strings are truncated to `max` characters with an ellipsis and
/// byte count indicator appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    let head = excerpt(s, max);
    if head.len() == s.len() {
        s.to_string()
    } else {
        format!("{}…(+{} bytes)", head, s.len() - head.len())
    }
}

/// Number of whitespace-separated tokens.
pub fn word_count(s: &str) -> usize {
    s.split_whitespace().count()
}

/// Current local time as ISO-8601 with microseconds, no offset.
pub fn now_iso() -> String {
    Local::now().naive_local().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

/// Ensure a directory exists and is writable.
///
/// This function creates the directory if it doesn't exist, then performs
/// a write test by creating and immediately deleting a scratch file.
///
/// # Errors
///
/// Returns an error if:
/// - The directory cannot be created
/// - The directory is not writable (permission denied, read-only filesystem, etc.)
#[instrument(level = "info", skip_all, fields(path = %path.display()))]
pub async fn ensure_writable_dir(path: &Path) -> Result<(), Box<dyn Error>> {
    fs::create_dir_all(path).await?;
    let scratch_path = path.join("..__write_check__");
    fs::write(&scratch_path, b"").await?;
    let _ = fs::remove_file(&scratch_path).await;
    info!("Data directory is writable");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_for_log_short_string() {
        let s = "Hello, world!";
        assert_eq!(truncate_for_log(s, 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_truncate_for_log_multibyte() {
        let s = "译".repeat(10);
        assert_eq!(truncate_for_log(&s, 4), format!("{}…(+18 bytes)", "译".repeat(4)));
    }

    #[test]
    fn test_excerpt() {
        assert_eq!(excerpt("hello", 3), "hel");
        assert_eq!(excerpt("hello", 10), "hello");
        assert_eq!(excerpt("中文字符", 2), "中文");
        assert_eq!(excerpt("", 5), "");
    }

    #[test]
    fn test_word_count() {
        assert_eq!(word_count("A short bit."), 3);
        assert_eq!(word_count("  two\twords \n"), 2);
        assert_eq!(word_count(""), 0);
    }

    #[test]
    fn test_now_iso_shape() {
        let ts = now_iso();
        assert!(chrono::NaiveDateTime::parse_from_str(&ts, "%Y-%m-%dT%H:%M:%S%.f").is_ok());
    }

    #[tokio::test]
    async fn test_ensure_writable_dir_creates() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("a/b");
        ensure_writable_dir(&nested).await.unwrap();
        assert!(nested.is_dir());
        assert!(!nested.join("..__write_check__").exists());
    }
}
