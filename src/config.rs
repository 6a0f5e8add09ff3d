use chrono::{Local, NaiveDate, NaiveDateTime};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants;
use crate::error::{AnalysisError, Result};

const DEFAULT_CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub data: DataConfig,
    pub output: OutputConfig,
    pub run: RunConfig,
}

/// Where the three input extracts live
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    pub dir: PathBuf,
    pub users_file: String,
    pub transactions_file: String,
    pub products_file: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
    pub chart_file: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Regenerate the column profiles on every run
    pub profiling: bool,
    /// Fixed "today" for age calculations; the local clock is used when unset
    pub reference_date: Option<NaiveDate>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(constants::DEFAULT_DATA_DIR),
            users_file: constants::DEFAULT_USERS_FILE.to_string(),
            transactions_file: constants::DEFAULT_TRANSACTIONS_FILE.to_string(),
            products_file: constants::DEFAULT_PRODUCTS_FILE.to_string(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(constants::DEFAULT_OUTPUT_DIR),
            chart_file: constants::DEFAULT_CHART_FILE.to_string(),
        }
    }
}

impl DataConfig {
    pub fn users_path(&self) -> PathBuf {
        self.dir.join(&self.users_file)
    }

    pub fn transactions_path(&self) -> PathBuf {
        self.dir.join(&self.transactions_file)
    }

    pub fn products_path(&self) -> PathBuf {
        self.dir.join(&self.products_file)
    }
}

impl OutputConfig {
    pub fn chart_path(&self) -> PathBuf {
        self.dir.join(&self.chart_file)
    }

    pub fn profiling_dir(&self) -> PathBuf {
        self.dir.join(constants::PROFILING_DIR)
    }
}

impl RunConfig {
    /// The instant every derived age is measured against
    pub fn reference_instant(&self) -> NaiveDateTime {
        match self.reference_date {
            Some(day) => day.and_time(chrono::NaiveTime::MIN),
            None => Local::now().naive_local(),
        }
    }
}

impl AppConfig {
    /// Load configuration from an explicit file, or from `config.toml` when it exists,
    /// falling back to defaults. Environment overrides are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };
        config.apply_env_overrides()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            AnalysisError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(dir) = env_value(constants::ENV_DATA_DIR) {
            self.data.dir = PathBuf::from(dir);
        }
        if let Some(dir) = env_value(constants::ENV_OUTPUT_DIR) {
            self.output.dir = PathBuf::from(dir);
        }
        if let Some(flag) = env_value(constants::ENV_PROFILING) {
            self.run.profiling = parse_flag(&flag).ok_or_else(|| {
                AnalysisError::Config(format!(
                    "{} must be true/false, got '{}'",
                    constants::ENV_PROFILING,
                    flag
                ))
            })?;
        }
        Ok(())
    }
}

fn env_value(key: &str) -> Option<String> {
    match std::env::var(key) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
