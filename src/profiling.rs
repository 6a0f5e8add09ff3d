//! Column profiles for a quick look at data quality before and after cleaning.

use serde::Serialize;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

use crate::domain::Record;
use crate::error::Result;

/// How many of the most frequent values each column profile keeps
pub const TOP_VALUES: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueCount {
    pub value: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnProfile {
    pub column: String,
    pub missing: usize,
    pub missing_ratio: f64,
    pub distinct: usize,
    pub most_frequent: Vec<ValueCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableProfile {
    pub table: String,
    pub rows: usize,
    pub columns: Vec<ColumnProfile>,
}

impl TableProfile {
    pub fn column(&self, name: &str) -> Option<&ColumnProfile> {
        self.columns.iter().find(|c| c.column == name)
    }
}

/// Profile every column of a table
pub fn profile_table<R: Record>(table: &str, rows: &[R]) -> TableProfile {
    let columns = R::columns();
    let mut missing = vec![0usize; columns.len()];
    let mut frequencies: Vec<HashMap<String, usize>> = vec![HashMap::new(); columns.len()];

    for row in rows {
        for (idx, value) in row.values().into_iter().enumerate().take(columns.len()) {
            match value {
                Some(v) => *frequencies[idx].entry(v).or_insert(0) += 1,
                None => missing[idx] += 1,
            }
        }
    }

    let columns = columns
        .iter()
        .zip(missing)
        .zip(frequencies)
        .map(|((name, missing), freq)| {
            let distinct = freq.len();
            let mut most_frequent: Vec<ValueCount> = freq
                .into_iter()
                .map(|(value, count)| ValueCount { value, count })
                .collect();
            // Highest count first, then by value so the output is stable
            most_frequent.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));
            most_frequent.truncate(TOP_VALUES);

            ColumnProfile {
                column: name.to_string(),
                missing,
                missing_ratio: if rows.is_empty() {
                    0.0
                } else {
                    missing as f64 / rows.len() as f64
                },
                distinct,
                most_frequent,
            }
        })
        .collect();

    TableProfile {
        table: table.to_string(),
        rows: rows.len(),
        columns,
    }
}

/// Write one `<table>_profile.json` per profile into `dir`
#[instrument(skip(profiles), fields(count = profiles.len()))]
pub fn write_profiles(profiles: &[TableProfile], dir: &Path) -> Result<Vec<PathBuf>> {
    fs::create_dir_all(dir)?;

    let mut written = Vec::with_capacity(profiles.len());
    for profile in profiles {
        let path = dir.join(format!("{}_profile.json", profile.table));
        fs::write(&path, serde_json::to_string_pretty(profile)?)?;
        info!("📊 Profile for {} ({} rows) written to {}", profile.table, profile.rows, path.display());
        written.push(path);
    }
    Ok(written)
}
