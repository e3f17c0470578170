use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tempfile::NamedTempFile;

use crate::config::OutputSettings;
use crate::error::{Error, Result};
use crate::merico::AnalysisKind;
use crate::models::ClassifiedDataset;

pub struct DatasetStore {
    output_dir: PathBuf,
    pretty: bool,
}

impl DatasetStore {
    pub fn new<P: AsRef<Path>>(output_dir: P, pretty: bool) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
            pretty,
        }
    }

    pub fn from_settings(settings: &OutputSettings) -> Self {
        Self::new(&settings.output_dir, settings.pretty_print)
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn latest_path(&self, kind: AnalysisKind) -> PathBuf {
        self.output_dir.join(format!("{}_latest.json", kind.file_prefix()))
    }

    pub fn run_path(&self, kind: AnalysisKind, generated_at: DateTime<Local>) -> PathBuf {
        self.output_dir.join(format!(
            "{}_{}.json",
            kind.file_prefix(),
            generated_at.format("%Y%m%d_%H%M%S_%3f")
        ))
    }

    pub fn save(
        &self,
        kind: AnalysisKind,
        dataset: &ClassifiedDataset,
        generated_at: DateTime<Local>,
    ) -> Result<PathBuf> {
        let bytes = if self.pretty {
            serde_json::to_vec_pretty(dataset)
        } else {
            serde_json::to_vec(dataset)
        }
        .map_err(|e| Error::persist(&self.output_dir, e))?;

        let path = self.run_path(kind, generated_at);
        // Run file first, never replacing an earlier run; the alias only
        // moves once the run file is complete
        write_new(&path, &bytes)?;
        write_atomic(&self.latest_path(kind), &bytes)?;

        tracing::info!("Classified dataset saved to {}", path.display());
        Ok(path)
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<ClassifiedDataset> {
        let bytes = std::fs::read(path.as_ref())?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub fn load_latest(&self, kind: AnalysisKind) -> Result<ClassifiedDataset> {
        let path = self.latest_path(kind);
        tracing::info!("Loading latest {} dataset from {}", kind, path.display());
        Self::load(path)
    }
}

/// Replace `path` with `contents` in one rename.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    let file = write_temp(path, contents)?;
    file.persist(path).map_err(|e| Error::persist(path, e.error))?;
    Ok(())
}

// Same as write_atomic, but fails if `path` already exists.
fn write_new(path: &Path, contents: &[u8]) -> Result<()> {
    let file = write_temp(path, contents)?;
    file.persist_noclobber(path)
        .map_err(|e| Error::persist(path, e.error))?;
    Ok(())
}

fn write_temp(path: &Path, contents: &[u8]) -> Result<NamedTempFile> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).map_err(|e| Error::persist(dir, e))?;

    // Same directory as the target so the rename never crosses filesystems
    let mut file = NamedTempFile::new_in(dir).map_err(|e| Error::persist(path, e))?;
    file.write_all(contents)
        .and_then(|_| file.as_file().sync_all())
        .map_err(|e| Error::persist(path, e))?;
    Ok(file)
}
