pub mod csv;
pub mod markdown;
pub mod text;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::error::Result;
use crate::merico::AnalysisKind;
use crate::models::ClassifiedDataset;
use crate::storage::write_atomic;

pub use self::csv::CsvReport;
pub use self::markdown::MarkdownReport;
pub use self::text::TextReport;

// Rows shown in the per-project and per-category tables
pub const TOP_N: usize = 20;

pub trait ReportRenderer: Send + Sync {
    fn name(&self) -> &str;

    fn file_name(&self, kind: AnalysisKind) -> String;

    fn render(
        &self,
        kind: AnalysisKind,
        dataset: &ClassifiedDataset,
        generated_at: DateTime<Local>,
    ) -> Result<String>;
}

#[derive(Debug)]
pub struct ArtifactResult {
    pub renderer: String,
    pub result: Result<PathBuf>,
}

pub fn default_renderers() -> Vec<Box<dyn ReportRenderer>> {
    vec![
        Box::new(MarkdownReport),
        Box::new(CsvReport),
        Box::new(TextReport),
    ]
}

pub fn render_all(
    renderers: &[Box<dyn ReportRenderer>],
    kind: AnalysisKind,
    dataset: &ClassifiedDataset,
    generated_at: DateTime<Local>,
    output_dir: &Path,
) -> Vec<ArtifactResult> {
    renderers
        .iter()
        .map(|renderer| {
            // A failing renderer only marks its own artifact; the rest still run
            let result = renderer
                .render(kind, dataset, generated_at)
                .and_then(|content| {
                    let path = output_dir.join(renderer.file_name(kind));
                    write_atomic(&path, content.as_bytes())?;
                    Ok(path)
                });

            match &result {
                Ok(path) => tracing::info!("{} report written to {}", renderer.name(), path.display()),
                Err(e) => tracing::warn!("{} report failed: {}", renderer.name(), e),
            }

            ArtifactResult {
                renderer: renderer.name().to_string(),
                result,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::classify;
    use crate::error::Error;

    struct Broken;

    impl ReportRenderer for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn file_name(&self, _kind: AnalysisKind) -> String {
            "broken.txt".to_string()
        }

        fn render(&self, _: AnalysisKind, _: &ClassifiedDataset, _: DateTime<Local>) -> Result<String> {
            Err(Error::Report("template missing".to_string()))
        }
    }

    #[test]
    fn test_one_failing_renderer_does_not_stop_the_rest() {
        let dir = tempfile::tempdir().unwrap();
        let mut renderers: Vec<Box<dyn ReportRenderer>> = vec![Box::new(Broken)];
        renderers.extend(default_renderers());

        let results = render_all(
            &renderers,
            AnalysisKind::Uncommented,
            &classify(&[]),
            Local::now(),
            dir.path(),
        );

        assert_eq!(results.len(), 4);
        assert!(results[0].result.is_err());
        for artifact in &results[1..] {
            let path = artifact.result.as_ref().unwrap();
            assert!(path.exists(), "{} missing", artifact.renderer);
        }
        assert!(!dir.path().join("broken.txt").exists());
    }
}
