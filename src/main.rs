use anyhow::Context;
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;

use receipt_analytics::config::AppConfig;
use receipt_analytics::constants;
use receipt_analytics::logging;
use receipt_analytics::pipeline::{CleanSummary, Pipeline, PipelineResult};

#[derive(Parser)]
#[command(name = "receipt_analytics")]
#[command(about = "Clean, join and report on receipt transaction extracts")]
#[command(version = "0.1.0")]
struct Cli {
    /// Configuration file (defaults to ./config.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline: clean, join, report and chart
    Run {
        #[arg(long)]
        data_dir: Option<PathBuf>,
        #[arg(long)]
        output_dir: Option<PathBuf>,
        /// Also write column profiles
        #[arg(long)]
        profile: bool,
        /// Day ages are measured against (YYYY-MM-DD)
        #[arg(long)]
        reference_date: Option<NaiveDate>,
    },
    /// Load and clean the tables, printing per-table row accounting
    Clean {
        #[arg(long)]
        data_dir: Option<PathBuf>,
        #[arg(long)]
        reference_date: Option<NaiveDate>,
    },
    /// Write column profiles of the raw and joined tables
    Profile {
        #[arg(long)]
        data_dir: Option<PathBuf>,
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
}

fn load_config(
    path: Option<&Path>,
    data_dir: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    reference_date: Option<NaiveDate>,
) -> anyhow::Result<AppConfig> {
    let mut config = AppConfig::load(path).context("Failed to load configuration")?;
    if let Some(dir) = data_dir {
        config.data.dir = dir;
    }
    if let Some(dir) = output_dir {
        config.output.dir = dir;
    }
    if reference_date.is_some() {
        config.run.reference_date = reference_date;
    }
    Ok(config)
}

fn print_run(result: &PipelineResult) {
    println!("\n{}", result.report.render());
    println!(
        "🔎 Barcode issues in products: {} missing, {} duplicated",
        result.barcode_issues.missing_barcodes, result.barcode_issues.duplicate_barcodes
    );
    match (&result.chart_file, &result.chart_error) {
        (Some(path), _) => println!("🖼️  Chart: {}", path.display()),
        (None, Some(err)) => println!("⚠️  Chart not written: {}", err),
        (None, None) => {}
    }
    for path in &result.profile_files {
        println!("📊 Profile: {}", path.display());
    }
    println!("💾 Run summary: {}", result.summary_file.display());
}

fn print_clean(summary: &CleanSummary) {
    println!("\n🧹 Cleaning summary (reference instant {})", summary.reference_instant);
    for stats in &summary.tables {
        println!("   {}: {} -> {} rows", stats.table, stats.rows_in, stats.rows_out);
        for (rule, removed) in &stats.dropped {
            println!("      - {}: {}", rule, removed);
        }
    }
    println!(
        "   Barcode issues: {} missing, {} duplicated",
        summary.barcode_issues.missing_barcodes, summary.barcode_issues.duplicate_barcodes
    );
}

fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let _log_guard = logging::init_logging(Path::new(constants::LOG_DIR));

    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    match cli.command {
        Commands::Run {
            data_dir,
            output_dir,
            profile,
            reference_date,
        } => {
            println!("🚀 Running receipt analysis...");
            let mut config = load_config(config_path, data_dir, output_dir, reference_date)?;
            if profile {
                config.run.profiling = true;
            }
            let result = Pipeline::run(&config).context("Analysis run failed")?;
            print_run(&result);
        }
        Commands::Clean {
            data_dir,
            reference_date,
        } => {
            println!("🧹 Cleaning input tables...");
            let config = load_config(config_path, data_dir, None, reference_date)?;
            let summary = Pipeline::clean_only(&config).context("Cleaning failed")?;
            print_clean(&summary);
        }
        Commands::Profile {
            data_dir,
            output_dir,
        } => {
            println!("📊 Profiling input tables...");
            let config = load_config(config_path, data_dir, output_dir, None)?;
            let written = Pipeline::profile(&config).context("Profiling failed")?;
            for path in &written {
                println!("   {}", path.display());
            }
            info!("Wrote {} profiles", written.len());
        }
    }

    Ok(())
}
