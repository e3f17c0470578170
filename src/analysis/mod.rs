pub mod classifier;
pub mod orchestrator;
pub mod pipeline;
pub mod retry;

pub use classifier::classify;
pub use orchestrator::BatchOrchestrator;
pub use pipeline::{AnalysisPipeline, RunReport};
pub use retry::RetryPolicy;
