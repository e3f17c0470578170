pub mod config;
pub mod error;
pub mod models;
pub mod merico;
pub mod analysis;
pub mod storage;
pub mod report;

pub use config::{Config, OrchestratorConfig};
pub use error::{Error, FetchError, Result};
pub use merico::{AnalysisKind, MericoClient, PageFetcher};
pub use analysis::{classify, AnalysisPipeline, BatchOrchestrator, RunReport};
pub use storage::DatasetStore;
pub use report::ReportRenderer;
