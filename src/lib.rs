pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod profiling;
pub mod report;

// Domain data shapes shared across stages
pub mod domain;

pub use config::AppConfig;
pub use error::{AnalysisError, Result};
pub use pipeline::{Pipeline, PipelineResult};
