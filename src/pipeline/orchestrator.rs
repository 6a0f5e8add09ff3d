use chrono::{NaiveDateTime, Utc};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::config::AppConfig;
use crate::constants;
use crate::domain::{JoinedRow, Transaction, User};
use crate::error::Result;
use crate::pipeline::ingestion::RawDataset;
use crate::pipeline::processing::clean::{BarcodeIssueSummary, CleanedProducts};
use crate::pipeline::processing::{clean_products, clean_transactions, clean_users, join, TableStats};
use crate::profiling::{profile_table, write_profiles, TableProfile};
use crate::report::chart::render_missing_barcode_chart;
use crate::report::{ReportResults, ReportStore};

/// Cleaning outcome for all three tables
#[derive(Debug, Clone, Serialize)]
pub struct CleanSummary {
    pub reference_instant: NaiveDateTime,
    pub tables: Vec<TableStats>,
    pub barcode_issues: BarcodeIssueSummary,
}

/// Everything a full run produced. This is also what gets written as the run summary.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResult {
    pub run_id: Uuid,
    pub reference_instant: NaiveDateTime,
    pub tables: Vec<TableStats>,
    pub joined_rows: usize,
    pub barcode_issues: BarcodeIssueSummary,
    pub report: ReportResults,
    /// `None` when the chart could not be drawn; `chart_error` says why
    pub chart_file: Option<PathBuf>,
    pub chart_error: Option<String>,
    pub profile_files: Vec<PathBuf>,
    #[serde(skip)]
    pub summary_file: PathBuf,
}

/// The three cleaned tables plus their accounting
struct CleanedTables {
    users: Vec<User>,
    transactions: Vec<Transaction>,
    products: CleanedProducts,
    tables: Vec<TableStats>,
}

impl CleanedTables {
    fn summary(&self, reference_instant: NaiveDateTime) -> CleanSummary {
        CleanSummary {
            reference_instant,
            tables: self.tables.clone(),
            barcode_issues: self.products.barcode_summary(),
        }
    }

    fn join(&self) -> Vec<JoinedRow> {
        join(&self.transactions, &self.users, &self.products.products)
    }
}

pub struct Pipeline;

impl Pipeline {
    /// Load, clean, join, report and chart, then persist a run summary
    #[instrument(skip(config))]
    pub fn run(config: &AppConfig) -> Result<PipelineResult> {
        let started = Instant::now();
        let run_id = Uuid::new_v4();
        let reference_instant = config.run.reference_instant();
        info!("🚀 Starting analysis run {} (reference instant {})", run_id, reference_instant);

        let raw = Self::load(config)?;

        let mut profiles = Vec::new();
        if config.run.profiling {
            profiles.extend(Self::raw_profiles(&raw));
        }

        info!("🧹 Cleaning tables...");
        let cleaned = Self::clean(raw, reference_instant);

        info!("🔗 Joining tables...");
        let joined = cleaned.join();

        let mut profile_files = Vec::new();
        if config.run.profiling {
            profiles.push(profile_table(constants::JOINED_TABLE, &joined));
            profile_files = write_profiles(&profiles, &config.output.profiling_dir())?;
        }

        info!("📈 Running report queries...");
        let store = ReportStore::open(&joined, &cleaned.products.duplicates)?;
        let report = store.run_all()?;

        let chart_path = config.output.chart_path();
        let (chart_file, chart_error) =
            match render_missing_barcode_chart(&report.missing_barcodes_by_brand, &chart_path) {
                Ok(()) => (Some(chart_path), None),
                Err(e) => {
                    warn!("Chart could not be drawn: {}", e);
                    (None, Some(e.to_string()))
                }
            };

        let mut result = PipelineResult {
            run_id,
            reference_instant,
            barcode_issues: cleaned.products.barcode_summary(),
            tables: cleaned.tables,
            joined_rows: joined.len(),
            report,
            chart_file,
            chart_error,
            profile_files,
            summary_file: PathBuf::new(),
        };

        result.summary_file = Self::persist_to_json(&result, &config.output.dir)?;
        info!("💾 Saved run summary to {}", result.summary_file.display());

        metrics::histogram!("receipt_analytics_run_duration_seconds")
            .record(started.elapsed().as_secs_f64());
        info!("✅ Run {} finished in {:.2?}", run_id, started.elapsed());
        Ok(result)
    }

    /// Load and clean only
    #[instrument(skip(config))]
    pub fn clean_only(config: &AppConfig) -> Result<CleanSummary> {
        let reference_instant = config.run.reference_instant();
        let raw = Self::load(config)?;
        let cleaned = Self::clean(raw, reference_instant);
        Ok(cleaned.summary(reference_instant))
    }

    /// Write column profiles of the raw tables and the joined table, whatever the run toggle says
    #[instrument(skip(config))]
    pub fn profile(config: &AppConfig) -> Result<Vec<PathBuf>> {
        let raw = Self::load(config)?;
        let mut profiles = Self::raw_profiles(&raw);

        let cleaned = Self::clean(raw, config.run.reference_instant());
        profiles.push(profile_table(constants::JOINED_TABLE, &cleaned.join()));

        write_profiles(&profiles, &config.output.profiling_dir())
    }

    fn load(config: &AppConfig) -> Result<RawDataset> {
        info!("📥 Loading input files from {}", config.data.dir.display());
        let raw = RawDataset::load(&config.data)?;
        info!(
            "✅ Loaded {} users, {} transactions, {} products",
            raw.users.len(),
            raw.transactions.len(),
            raw.products.len()
        );
        Ok(raw)
    }

    fn raw_profiles(raw: &RawDataset) -> Vec<TableProfile> {
        vec![
            profile_table(constants::USERS_TABLE, &raw.users),
            profile_table(constants::TRANSACTIONS_TABLE, &raw.transactions),
            profile_table(constants::PRODUCTS_TABLE, &raw.products),
        ]
    }

    fn clean(raw: RawDataset, reference_instant: NaiveDateTime) -> CleanedTables {
        let (users, user_stats) = clean_users(raw.users, reference_instant);
        let (transactions, transaction_stats) = clean_transactions(raw.transactions);
        let products = clean_products(raw.products);
        let tables = vec![user_stats, transaction_stats, products.stats.clone()];
        CleanedTables {
            users,
            transactions,
            products,
            tables,
        }
    }

    /// Persist the run summary as pretty JSON
    fn persist_to_json(result: &PipelineResult, output_dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(output_dir)?;

        let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
        let filename = format!("run_summary_{timestamp}_{}.json", result.run_id.simple());
        let filepath = output_dir.join(filename);

        fs::write(&filepath, serde_json::to_string_pretty(result)?)?;
        Ok(filepath)
    }
}
