use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Local};
use tokio_util::sync::CancellationToken;

use crate::analysis::{classify, BatchOrchestrator};
use crate::config::{Config, OrchestratorConfig};
use crate::error::Result;
use crate::merico::{AnalysisKind, MericoClient, PageFetcher};
use crate::models::{ClassifiedDataset, RepoId};
use crate::report::{default_renderers, render_all, ArtifactResult, ReportRenderer};
use crate::storage::DatasetStore;

#[derive(Debug)]
pub struct RunReport {
    pub kind: AnalysisKind,
    pub dataset: ClassifiedDataset,
    pub generated_at: DateTime<Local>,
    // None when save_classified is off
    pub dataset_path: Option<PathBuf>,
    pub artifacts: Vec<ArtifactResult>,
}

impl RunReport {
    pub fn is_degraded(&self) -> bool {
        self.dataset.summary().is_degraded()
    }
}

pub struct AnalysisPipeline {
    orchestrator: BatchOrchestrator,
    store: Option<DatasetStore>,
    renderers: Vec<Box<dyn ReportRenderer>>,
    output_dir: PathBuf,
}

impl AnalysisPipeline {
    pub fn new(orchestrator: BatchOrchestrator, output_dir: impl AsRef<Path>) -> Self {
        Self {
            orchestrator,
            store: None,
            renderers: default_renderers(),
            output_dir: output_dir.as_ref().to_path_buf(),
        }
    }

    /// Wire a pipeline against the live Merico API for `kind`.
    pub fn from_config(config: &Config, kind: AnalysisKind, show_progress: bool) -> Result<Self> {
        let client = MericoClient::new(config.endpoint(kind), &config.token)?;
        tracing::info!("Using {} endpoint {}", kind, client.endpoint());
        let mut orchestrator_config = OrchestratorConfig::from(config);
        orchestrator_config.show_progress = show_progress;

        let fetcher: Arc<dyn PageFetcher> = Arc::new(client);
        let orchestrator = BatchOrchestrator::new(fetcher, kind, config.filter.clone(), orchestrator_config);

        let output = &config.output_settings;
        let mut pipeline = Self::new(orchestrator, &output.output_dir);
        if output.save_classified {
            pipeline = pipeline.with_store(DatasetStore::from_settings(output));
        }
        Ok(pipeline)
    }

    pub fn with_store(mut self, store: DatasetStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_renderers(mut self, renderers: Vec<Box<dyn ReportRenderer>>) -> Self {
        self.renderers = renderers;
        self
    }

    pub fn kind(&self) -> AnalysisKind {
        self.orchestrator.kind()
    }

    pub async fn run(&self, repo_ids: &[RepoId], cancel: &CancellationToken) -> Result<RunReport> {
        let kind = self.kind();
        let outcomes = self.orchestrator.run_until_cancelled(repo_ids, cancel).await;

        tracing::info!("Classifying {} outcomes", outcomes.len());
        let dataset = classify(&outcomes);
        let generated_at = Local::now();

        // A failed dataset write aborts the run; report failures only land in artifacts
        let dataset_path = match &self.store {
            Some(store) => Some(store.save(kind, &dataset, generated_at)?),
            None => {
                tracing::info!("save_classified is off, dataset not written");
                None
            }
        };

        let artifacts = render_all(&self.renderers, kind, &dataset, generated_at, &self.output_dir);

        let summary = dataset.summary();
        tracing::info!(
            "{} run complete: {}/{} projects, {} functions",
            kind,
            summary.successful_projects,
            summary.total_projects,
            summary.total_function_count
        );

        Ok(RunReport {
            kind,
            dataset,
            generated_at,
            dataset_path,
            artifacts,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, FetchError};
    use crate::merico::{PageResponse, RequestPayload};
    use async_trait::async_trait;
    use serde_json::json;
    use std::time::Duration;

    struct OneRecord;

    #[async_trait]
    impl PageFetcher for OneRecord {
        async fn fetch_page(&self, request: &RequestPayload, _timeout: Duration) -> std::result::Result<PageResponse, FetchError> {
            if request.repo_id() == "bad" {
                return Err(FetchError::Http(reqwest::StatusCode::UNAUTHORIZED));
            }
            PageResponse::from_value(json!({ "data": [{ "severity": "low" }], "totalPages": 1 }))
        }
    }

    fn pipeline(output_dir: &Path) -> AnalysisPipeline {
        let config = OrchestratorConfig {
            batch_delay: Duration::ZERO,
            show_progress: false,
            ..Default::default()
        };
        let orchestrator = BatchOrchestrator::new(Arc::new(OneRecord), AnalysisKind::Duplicate, Default::default(), config);
        AnalysisPipeline::new(orchestrator, output_dir)
    }

    #[tokio::test]
    async fn test_run_persists_and_renders() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = pipeline(dir.path()).with_store(DatasetStore::new(dir.path(), false));

        let report = pipeline
            .run(&["good".to_string(), "bad".to_string()], &CancellationToken::new())
            .await
            .unwrap();

        assert!(!report.is_degraded());
        assert_eq!(report.dataset.summary().failed_projects, 1);
        assert!(report.dataset_path.as_ref().unwrap().exists());
        assert!(dir.path().join("classified_duplicate_latest.json").exists());
        assert!(report.artifacts.iter().all(|a| a.result.is_ok()));

        let latest = DatasetStore::new(dir.path(), false)
            .load_latest(AnalysisKind::Duplicate)
            .unwrap();
        assert_eq!(latest, report.dataset);
    }

    #[tokio::test]
    async fn test_run_without_store_writes_reports_only() {
        let dir = tempfile::tempdir().unwrap();
        let report = pipeline(dir.path())
            .run(&["bad".to_string()], &CancellationToken::new())
            .await
            .unwrap();

        assert!(report.is_degraded());
        assert!(report.dataset_path.is_none());
        assert!(!dir.path().join("classified_duplicate_latest.json").exists());
        assert!(dir.path().join("classified_duplicate_report.md").exists());
    }

    #[tokio::test]
    async fn test_persist_failure_aborts_run() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"").unwrap();

        let result = pipeline(dir.path())
            .with_store(DatasetStore::new(&blocker, false))
            .run(&["good".to_string()], &CancellationToken::new())
            .await;

        assert!(matches!(result, Err(Error::Persist { .. })));
    }
}
