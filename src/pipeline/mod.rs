// Analysis pipeline: ingestion, processing (clean + join), and the orchestrator that runs them

pub mod ingestion;
pub mod orchestrator;
pub mod processing;

pub use ingestion::{load_table, RawDataset};
pub use orchestrator::{CleanSummary, Pipeline, PipelineResult};
