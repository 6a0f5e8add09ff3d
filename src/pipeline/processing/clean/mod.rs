//! Per-table cleaning rules.
//!
//! Each table is cleaned independently. Every rule that removes rows reports how many it
//! removed, so a run can account for every input row.

pub mod products;
pub mod transactions;
pub mod users;

use chrono::{DateTime, Datelike, Months, NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use std::hash::Hash;
use tracing::{debug, info};

use crate::constants;

pub use products::{clean_products, BarcodeIssueSummary, CleanedProducts};
pub use transactions::clean_transactions;
pub use users::{clean_users, normalize_gender};

/// Row accounting for one cleaned table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableStats {
    pub table: String,
    pub rows_in: usize,
    pub rows_out: usize,
    /// Rows removed, keyed by the rule that removed them
    pub dropped: BTreeMap<String, usize>,
}

impl TableStats {
    pub fn new(table: &str, rows_in: usize) -> Self {
        Self {
            table: table.to_string(),
            rows_in,
            rows_out: rows_in,
            dropped: BTreeMap::new(),
        }
    }

    /// Record that `rule` took the table from `before` rows down to `after`
    pub fn record_drop(&mut self, rule: &'static str, before: usize, after: usize) {
        let removed = before.saturating_sub(after);
        debug!(table = %self.table, rule, removed, "cleaning rule applied");
        metrics::counter!(
            "receipt_analytics_rows_dropped_total",
            "table" => self.table.clone(),
            "rule" => rule
        )
        .increment(removed as u64);
        *self.dropped.entry(rule.to_string()).or_insert(0) += removed;
        self.rows_out = after;
    }

    pub fn dropped_by(&self, rule: &str) -> usize {
        self.dropped.get(rule).copied().unwrap_or(0)
    }

    pub fn log_summary(&self) {
        info!(
            "🧹 Cleaned {}: {} -> {} rows ({:?})",
            self.table, self.rows_in, self.rows_out, self.dropped
        );
    }
}

/// Remove rows equal to an earlier row in every column, keeping the first occurrence
pub fn drop_exact_duplicates<T: Clone + Eq + Hash>(rows: Vec<T>) -> Vec<T> {
    let mut seen = HashSet::with_capacity(rows.len());
    rows.into_iter().filter(|row| seen.insert(row.clone())).collect()
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S%.f Z",
    "%Y-%m-%d %H:%M:%S Z",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
];

/// Parse a timestamp in any of the layouts seen in the extracts.
///
/// Offsets are discarded and the wall-clock time kept. Anything unparseable is missing.
pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let value = raw.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|dt| dt.naive_local())
        })
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(chrono::NaiveTime::MIN))
        })
}

/// Parse a numeric cell; anything non-numeric (including NaN and infinities) is missing
pub fn parse_number(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Whole calendar months from `start` to `end`, negative when `end` precedes `start`.
///
/// A month counts once the same day-of-month and time is reached, clamping to the last day
/// of shorter months (Jan 31 + 1 month is Feb 28/29).
pub fn elapsed_months(start: NaiveDateTime, end: NaiveDateTime) -> i32 {
    if end < start {
        return -elapsed_months(end, start);
    }
    let mut months =
        (end.year() - start.year()) * 12 + (end.month() as i32 - start.month() as i32);
    while months > 0 {
        match start.checked_add_months(Months::new(months as u32)) {
            Some(anniversary) if anniversary <= end => break,
            _ => months -= 1,
        }
    }
    months
}

/// Whole calendar years from `start` to `end`
pub fn elapsed_years(start: NaiveDateTime, end: NaiveDateTime) -> i32 {
    elapsed_months(start, end) / 12
}

/// Canonical text key for a barcode cell.
///
/// Missing-value tokens become `None`. Integer barcodes that went through a float export
/// (`"12345.0"`) get their digits back.
pub fn canonical_barcode(raw: Option<&str>) -> Option<String> {
    let value = raw?.trim();
    if value.is_empty() || constants::MISSING_BARCODE_TOKENS.contains(&value) {
        return None;
    }
    match value.strip_suffix(".0") {
        Some(digits) if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) => {
            Some(digits.to_string())
        }
        _ => Some(value.to_string()),
    }
}

pub fn min_birth_date() -> NaiveDateTime {
    let (y, m, d) = constants::MIN_BIRTH_DATE;
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap_or(NaiveDate::MIN)
        .and_time(chrono::NaiveTime::MIN)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_parse_datetime_layouts() {
        let expected = NaiveDate::from_ymd_opt(2000, 8, 11)
            .unwrap()
            .and_hms_opt(14, 5, 9)
            .unwrap();
        assert_eq!(parse_datetime("2000-08-11 14:05:09.000 Z"), Some(expected));
        assert_eq!(parse_datetime("2000-08-11 14:05:09"), Some(expected));
        assert_eq!(parse_datetime("2000-08-11T14:05:09Z"), Some(expected));
        assert_eq!(parse_datetime("2000-08-11T14:05:09+02:00"), Some(expected));
        assert_eq!(parse_datetime("2000-08-11"), Some(at(2000, 8, 11)));
        assert_eq!(parse_datetime("not a date"), None);
        assert_eq!(parse_datetime("2000-13-45"), None);
    }

    #[test]
    fn test_parse_number() {
        assert_eq!(parse_number("1.50"), Some(1.5));
        assert_eq!(parse_number(" 3 "), Some(3.0));
        assert_eq!(parse_number("abc"), None);
        assert_eq!(parse_number("NaN"), None);
    }

    #[test]
    fn test_elapsed_months_counts_whole_months() {
        assert_eq!(elapsed_months(at(2023, 9, 6), at(2025, 3, 6)), 18);
        assert_eq!(elapsed_months(at(2023, 9, 7), at(2025, 3, 6)), 17);
        assert_eq!(elapsed_months(at(2025, 3, 6), at(2025, 3, 6)), 0);
    }

    #[test]
    fn test_elapsed_months_clamps_month_end() {
        assert_eq!(elapsed_months(at(2025, 1, 31), at(2025, 2, 28)), 1);
        assert_eq!(elapsed_months(at(2024, 1, 31), at(2024, 2, 28)), 0);
    }

    #[test]
    fn test_elapsed_months_future_start_is_negative() {
        assert_eq!(elapsed_months(at(2025, 6, 1), at(2025, 3, 1)), -3);
    }

    #[test]
    fn test_elapsed_years_respects_birthday() {
        assert_eq!(elapsed_years(at(2000, 3, 7), at(2025, 3, 6)), 24);
        assert_eq!(elapsed_years(at(2000, 3, 6), at(2025, 3, 6)), 25);
        assert_eq!(elapsed_years(at(2004, 2, 29), at(2025, 2, 28)), 21);
    }

    #[test]
    fn test_canonical_barcode() {
        assert_eq!(canonical_barcode(Some("028400070560")).as_deref(), Some("028400070560"));
        assert_eq!(canonical_barcode(Some("17000329260.0")).as_deref(), Some("17000329260"));
        assert_eq!(canonical_barcode(Some(" 123 ")).as_deref(), Some("123"));
        assert_eq!(canonical_barcode(Some("ABC.0")).as_deref(), Some("ABC.0"));
        assert_eq!(canonical_barcode(Some("nan")), None);
        assert_eq!(canonical_barcode(Some("N/A")), None);
        assert_eq!(canonical_barcode(Some("")), None);
        assert_eq!(canonical_barcode(None), None);
    }

    #[test]
    fn test_drop_exact_duplicates_keeps_first() {
        let rows = vec![("a", 1), ("b", 2), ("a", 1), ("a", 2)];
        assert_eq!(drop_exact_duplicates(rows), vec![("a", 1), ("b", 2), ("a", 2)]);
    }

    #[test]
    fn test_table_stats_accumulates_drops() {
        let mut stats = TableStats::new("users", 10);
        stats.record_drop("exact_duplicate", 10, 8);
        stats.record_drop("under_age", 8, 5);
        assert_eq!(stats.rows_out, 5);
        assert_eq!(stats.dropped_by("exact_duplicate"), 2);
        assert_eq!(stats.dropped_by("under_age"), 3);
        assert_eq!(stats.dropped_by("missing"), 0);
    }
}
