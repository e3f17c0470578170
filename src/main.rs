use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use chrono::Local;
use clap::{Parser, Subcommand, ValueEnum};
use tokio_util::sync::CancellationToken;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use merico_agent::config::DEFAULT_CONFIG_FILE;
use merico_agent::models::ClassifiedDataset;
use merico_agent::report::{default_renderers, render_all, ArtifactResult, ReportRenderer, TextReport};
use merico_agent::{AnalysisKind, AnalysisPipeline, Config, DatasetStore, RunReport};

const LOG_FILE: &str = "merico-agent.log";

#[derive(Parser, Debug)]
#[command(name = "merico-agent")]
#[command(version = "0.1.0")]
#[command(about = "Fetch and classify Merico function reports across many repositories")]
struct Cli {
    /// Path to the JSON config file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE, global = true)]
    config: PathBuf,

    /// Only log warnings and hide the progress bar
    #[arg(short, long, global = true)]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch, classify, persist and render reports
    Analyze {
        #[arg(short, long, value_enum, default_value = "uncommented")]
        kind: KindArg,

        /// JSON array of repository ids (overrides repo_ids_file)
        #[arg(long)]
        repo_ids: Option<PathBuf>,

        /// Maximum repositories fetched at once
        #[arg(long)]
        concurrency: Option<usize>,
    },

    /// Re-render reports from a stored dataset
    Report {
        /// Dataset file (defaults to the latest one for the kind)
        #[arg(short, long)]
        file: Option<PathBuf>,

        #[arg(short, long, value_enum, default_value = "uncommented")]
        kind: KindArg,
    },

    /// Write a config template
    InitConfig {
        #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
        output: PathBuf,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum KindArg {
    Uncommented,
    Duplicate,
    All,
}

impl KindArg {
    fn kinds(self) -> Vec<AnalysisKind> {
        match self {
            KindArg::Uncommented => vec![AnalysisKind::Uncommented],
            KindArg::Duplicate => vec![AnalysisKind::Duplicate],
            KindArg::All => AnalysisKind::ALL.to_vec(),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // Load environment variables before config so overrides apply
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    if let Command::InitConfig { output } = &cli.command {
        Config::write_template(output)?;
        println!("Config template written to {}", output.display());
        return Ok(ExitCode::SUCCESS);
    }

    let mut config = Config::load(&cli.config)?;
    // Guard flushes the file writer on exit
    let _guard = init_logging(&config.output_settings.log_dir, cli.quiet)?;

    match cli.command {
        Command::Analyze {
            kind,
            repo_ids,
            concurrency,
        } => {
            if let Some(path) = repo_ids {
                config.repo_ids_file = path;
            }
            if let Some(limit) = concurrency {
                config.request_settings.concurrency = limit;
            }
            analyze(&config, kind.kinds(), cli.quiet).await
        }
        Command::Report { file, kind } => report(&config, file, kind.kinds()),
        Command::InitConfig { .. } => Ok(ExitCode::SUCCESS),
    }
}

fn init_logging(log_dir: &Path, quiet: bool) -> anyhow::Result<WorkerGuard> {
    let default_level = if quiet { "warn" } else { "info" };
    let filter = EnvFilter::try_from_default_env().or_else(|_| {
        EnvFilter::try_new(format!("merico_agent={},reqwest=warn", default_level))
    })?;

    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;
    let (file_writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::daily(log_dir, LOG_FILE));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::fmt::layer().with_ansi(false).with_writer(file_writer))
        .init();

    Ok(guard)
}

async fn analyze(config: &Config, kinds: Vec<AnalysisKind>, quiet: bool) -> anyhow::Result<ExitCode> {
    for kind in &kinds {
        config.validate(*kind)?;
    }
    let repo_ids = config.load_repo_ids()?;
    let show_progress = !quiet && std::io::stderr().is_terminal();

    // Ctrl+C resolves pending repos as Cancelled; the partial dataset is still saved
    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, finishing with what was fetched so far");
            ctrl_c.cancel();
        }
    });

    let mut degraded = false;
    let mut failed_kinds = 0;

    for kind in kinds.iter().copied() {
        tracing::info!("Starting {} analysis", kind);
        let result = match AnalysisPipeline::from_config(config, kind, show_progress) {
            Ok(pipeline) => pipeline.run(&repo_ids, &cancel).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(run) => {
                print_run(&run);
                degraded |= run.is_degraded();
            }
            Err(e) => {
                tracing::error!("{} analysis failed: {}", kind, e);
                failed_kinds += 1;
            }
        }

        // Don't start the next kind after an interrupt
        if cancel.is_cancelled() {
            break;
        }
    }

    if failed_kinds == kinds.len() {
        anyhow::bail!("no analysis completed");
    }
    Ok(if degraded || failed_kinds > 0 {
        ExitCode::from(2)
    } else {
        ExitCode::SUCCESS
    })
}

fn report(config: &Config, file: Option<PathBuf>, kinds: Vec<AnalysisKind>) -> anyhow::Result<ExitCode> {
    if file.is_some() && kinds.len() != 1 {
        anyhow::bail!("--file needs a single --kind");
    }

    let store = DatasetStore::from_settings(&config.output_settings);
    let renderers = default_renderers();

    for kind in kinds {
        let dataset = match &file {
            Some(path) => DatasetStore::load(path),
            None => store.load_latest(kind),
        }
        .with_context(|| format!("No stored {} dataset to report on", kind))?;

        let generated_at = Local::now();
        let artifacts = render_all(&renderers, kind, &dataset, generated_at, store.output_dir());
        print_summary(kind, &dataset);
        print_artifacts(&artifacts);
    }

    Ok(ExitCode::SUCCESS)
}

fn print_run(run: &RunReport) {
    print_summary(run.kind, &run.dataset);
    if let Some(path) = &run.dataset_path {
        println!("Dataset: {}", path.display());
    }
    print_artifacts(&run.artifacts);
}

fn print_summary(kind: AnalysisKind, dataset: &ClassifiedDataset) {
    match TextReport.render(kind, dataset, Local::now()) {
        Ok(text) => println!("{}", text),
        Err(e) => tracing::warn!("Could not render summary: {}", e),
    }
}

fn print_artifacts(artifacts: &[ArtifactResult]) {
    for artifact in artifacts {
        match &artifact.result {
            Ok(path) => println!("{:>8}: {}", artifact.renderer, path.display()),
            Err(e) => println!("{:>8}: failed ({})", artifact.renderer, e),
        }
    }
}
