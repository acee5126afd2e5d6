//! Publication date detection in essay pages.
//!
//! Essays put their date near the top as free text ("July 2023"), so the
//! page is searched with a handful of patterns, first in the opening 2000
//! characters and then in the whole page. The first candidate that parses
//! to a plausible date wins.

use chrono::{Datelike, Local, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

/// Earliest year accepted as a publication date.
pub const EARLIEST_YEAR: i32 = 1995;

const HEAD_CHARS: usize = 2000;

static DATE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\w+ \d{4}",
        r"(?i)\w+, \d{4}",
        r"\d{1,2}/\d{1,2}/\d{4}",
        r"\d{4}-\d{2}-\d{2}",
        r"(?i)\w+ \d{1,2}, \d{4}",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("date pattern compiles"))
    .collect()
});

static MONTH_YEAR: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\w+),?\s+(\d{4})$").expect("month-year pattern compiles"));
static MONTH_DAY_YEAR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\w+)\s+(\d{1,2}),\s+(\d{4})$").expect("month-day-year pattern compiles")
});
static SLASH_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,2})/(\d{1,2})/(\d{4})$").expect("slash date pattern compiles")
});
static ISO_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{4})-(\d{2})-(\d{2})$").expect("iso date pattern compiles"));

fn month_number(name: &str) -> Option<u32> {
    let n = match name.to_lowercase().as_str() {
        "january" | "jan" => 1,
        "february" | "feb" => 2,
        "march" | "mar" => 3,
        "april" | "apr" => 4,
        "may" => 5,
        "june" | "jun" => 6,
        "july" | "jul" => 7,
        "august" | "aug" => 8,
        "september" | "sep" | "sept" => 9,
        "october" | "oct" => 10,
        "november" | "nov" => 11,
        "december" | "dec" => 12,
        _ => return None,
    };
    Some(n)
}

/// Parse one date phrase; a missing day becomes the 1st.
pub fn parse_date_string(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if let Some(c) = MONTH_YEAR.captures(s) {
        let month = month_number(&c[1])?;
        return NaiveDate::from_ymd_opt(c[2].parse().ok()?, month, 1);
    }
    if let Some(c) = MONTH_DAY_YEAR.captures(s) {
        let month = month_number(&c[1])?;
        return NaiveDate::from_ymd_opt(c[3].parse().ok()?, month, c[2].parse().ok()?);
    }
    if let Some(c) = SLASH_DATE.captures(s) {
        return NaiveDate::from_ymd_opt(c[3].parse().ok()?, c[1].parse().ok()?, c[2].parse().ok()?);
    }
    if let Some(c) = ISO_DATE.captures(s) {
        return NaiveDate::from_ymd_opt(c[1].parse().ok()?, c[2].parse().ok()?, c[3].parse().ok()?);
    }
    None
}

/// Between [`EARLIEST_YEAR`] and the current year, inclusive.
pub fn is_plausible(date: NaiveDate) -> bool {
    (EARLIEST_YEAR..=Local::now().year()).contains(&date.year())
}

/// Parse a stored `YYYY-MM-DD` value, rejecting implausible years.
pub fn parse_stored_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .filter(|d| is_plausible(*d))
}

fn scan(text: &str) -> Option<NaiveDate> {
    DATE_PATTERNS.iter().find_map(|pattern| {
        pattern
            .find_iter(text)
            .filter_map(|m| parse_date_string(m.as_str()))
            .find(|d| is_plausible(*d))
    })
}

/// Find the publication date of a page, as `YYYY-MM-DD`.
pub fn find_date(page: &str) -> Option<String> {
    let head = crate::utils::excerpt(page, HEAD_CHARS);
    scan(head)
        .or_else(|| scan(page))
        .map(|d| d.format("%Y-%m-%d").to_string())
}
