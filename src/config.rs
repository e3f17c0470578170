use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::analysis::RetryPolicy;
use crate::error::{Error, Result};
use crate::merico::{AnalysisKind, Filter};
use crate::models::RepoId;

pub const DEFAULT_CONFIG_FILE: &str = "config.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_url: String,
    pub duplicate_url: String,
    pub token: String,
    pub repo_ids_file: PathBuf,
    pub filter: Filter,
    pub request_settings: RequestSettings,
    pub output_settings: OutputSettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: String::new(),
            duplicate_url: String::new(),
            token: String::new(),
            repo_ids_file: PathBuf::from("repoIds_simple.json"),
            filter: Filter::default(),
            request_settings: RequestSettings::default(),
            output_settings: OutputSettings::default(),
        }
    }
}

// Timing values are in seconds, as in the config file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestSettings {
    pub timeout: f64,
    pub retry_times: u32,
    pub retry_delay: f64,
    pub backoff_factor: f64,
    pub batch_delay: f64,
    pub page_size: u32,
    pub max_pages: u32,
    pub concurrency: usize,
    pub requests_per_minute: Option<u32>,
    pub run_timeout: Option<f64>,
}

impl Default for RequestSettings {
    fn default() -> Self {
        Self {
            timeout: 30.0,
            retry_times: 3,
            retry_delay: 2.0,
            backoff_factor: 1.0,
            batch_delay: 0.5,
            page_size: 100,
            max_pages: 1000,
            concurrency: 1,
            requests_per_minute: None,
            run_timeout: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub output_dir: PathBuf,
    pub log_dir: PathBuf,
    pub save_classified: bool,
    pub pretty_print: bool,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("output"),
            log_dir: PathBuf::from("log"),
            save_classified: true,
            pretty_print: true,
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let raw = std::fs::read_to_string(path).map_err(|e| {
                Error::Config(format!("Failed to read {}: {}", path.display(), e))
            })?;
            let config: Config = serde_json::from_str(&raw).map_err(|e| {
                Error::Config(format!("Malformed config file {}: {}", path.display(), e))
            })?;
            tracing::info!("Loaded config file: {}", path.display());
            config
        } else {
            // Missing file is fine; env vars may carry everything
            tracing::warn!("Config file {} not found, using defaults", path.display());
            Config::default()
        };

        // Environment beats file beats default
        config.apply_env()?;
        Ok(config)
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Ok(token) = env::var("MERICO_TOKEN") {
            self.token = token;
        }
        if let Ok(url) = env::var("MERICO_API_URL") {
            self.api_url = url;
        }
        if let Ok(url) = env::var("MERICO_DUPLICATE_URL") {
            self.duplicate_url = url;
        }
        if let Ok(path) = env::var("MERICO_REPO_IDS_FILE") {
            self.repo_ids_file = PathBuf::from(path);
        }
        if let Ok(value) = env::var("MERICO_CONCURRENCY") {
            self.request_settings.concurrency = value.parse().map_err(|_| {
                Error::Config(format!("MERICO_CONCURRENCY is not a number: {}", value))
            })?;
        }
        Ok(())
    }

    /// Check everything a run of `kind` needs before any network call.
    pub fn validate(&self, kind: AnalysisKind) -> Result<()> {
        if self.token.trim().is_empty() {
            return Err(Error::Config(
                "token is not set (config file or MERICO_TOKEN)".to_string(),
            ));
        }
        if self.endpoint(kind).trim().is_empty() {
            return Err(Error::Config(format!(
                "no endpoint configured for {} analysis",
                kind
            )));
        }

        let request = &self.request_settings;
        if request.retry_times == 0 {
            return Err(Error::Config("request_settings.retry_times must be at least 1".to_string()));
        }
        if request.page_size == 0 {
            return Err(Error::Config("request_settings.page_size must be at least 1".to_string()));
        }
        if request.max_pages == 0 {
            return Err(Error::Config("request_settings.max_pages must be at least 1".to_string()));
        }

        // Negative or NaN would panic in Duration conversion later
        let durations = [
            ("timeout", Some(request.timeout)),
            ("retry_delay", Some(request.retry_delay)),
            ("backoff_factor", Some(request.backoff_factor)),
            ("batch_delay", Some(request.batch_delay)),
            ("run_timeout", request.run_timeout),
        ];
        for (name, value) in durations {
            if let Some(value) = value {
                if !value.is_finite() || value < 0.0 {
                    return Err(Error::Config(format!(
                        "request_settings.{} must be a non-negative number, got {}",
                        name, value
                    )));
                }
            }
        }
        if request.timeout == 0.0 {
            return Err(Error::Config("request_settings.timeout must be positive".to_string()));
        }

        Ok(())
    }

    pub fn endpoint(&self, kind: AnalysisKind) -> &str {
        match kind {
            AnalysisKind::Uncommented => &self.api_url,
            AnalysisKind::Duplicate => &self.duplicate_url,
        }
    }

    pub fn load_repo_ids(&self) -> Result<Vec<RepoId>> {
        load_repo_ids(&self.repo_ids_file)
    }

    /// Placeholder config written by `init-config`.
    pub fn template() -> Self {
        Self {
            api_url: "your-merico-api-url".to_string(),
            duplicate_url: "your-merico-duplicate-group-url".to_string(),
            token: "your-merico-token".to_string(),
            ..Default::default()
        }
    }

    pub fn write_template<P: AsRef<Path>>(path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(&Self::template())?;
        std::fs::write(path.as_ref(), json)
            .map_err(|e| Error::persist(path.as_ref(), e))?;
        Ok(())
    }
}

/// Read a JSON array of repository ids.
pub fn load_repo_ids<P: AsRef<Path>>(path: P) -> Result<Vec<RepoId>> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read repo id file {}: {}", path.display(), e)))?;
    let ids: Vec<RepoId> = serde_json::from_str(&raw).map_err(|e| {
        Error::Config(format!(
            "Repo id file {} must be a JSON array of strings: {}",
            path.display(),
            e
        ))
    })?;
    tracing::info!("Loaded {} repo ids from {}", ids.len(), path.display());
    Ok(ids)
}

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub page_size: u32,
    pub max_pages: u32,
    pub request_timeout: Duration,
    pub retry: RetryPolicy,
    pub batch_delay: Duration,
    pub concurrency_limit: usize,
    pub requests_per_minute: Option<u32>,
    pub run_timeout: Option<Duration>,
    pub show_progress: bool,
}

impl From<&Config> for OrchestratorConfig {
    fn from(config: &Config) -> Self {
        let request = &config.request_settings;
        Self {
            page_size: request.page_size,
            max_pages: request.max_pages,
            request_timeout: seconds(request.timeout),
            retry: RetryPolicy {
                max_attempts: request.retry_times,
                delay: seconds(request.retry_delay),
                backoff_factor: request.backoff_factor,
            },
            batch_delay: seconds(request.batch_delay),
            concurrency_limit: request.concurrency.max(1),
            requests_per_minute: request.requests_per_minute,
            run_timeout: request.run_timeout.map(seconds),
            show_progress: true,
        }
    }
}

// Unvalidated negative or NaN values collapse to zero instead of panicking.
fn seconds(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or_default()
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}
