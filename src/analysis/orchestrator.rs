use std::collections::HashSet;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use backon::Retryable;
use futures::future::join_all;
use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::config::OrchestratorConfig;
use crate::error::FetchError;
use crate::merico::{AnalysisKind, Filter, PageFetcher, Paginator, RateLimiter};
use crate::models::{FetchOutcome, RepoId};

pub struct BatchOrchestrator {
    fetcher: Arc<dyn PageFetcher>,
    kind: AnalysisKind,
    filter: Filter,
    config: OrchestratorConfig,
}

struct Gates {
    // Spaces out the start of successive repositories
    repo: RateLimiter,
    // Every page request, across all workers
    request: RateLimiter,
}

impl BatchOrchestrator {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        kind: AnalysisKind,
        filter: Filter,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            fetcher,
            kind,
            filter,
            config,
        }
    }

    pub fn kind(&self) -> AnalysisKind {
        self.kind
    }

    pub async fn run(&self, repo_ids: &[RepoId]) -> Vec<FetchOutcome> {
        self.run_until_cancelled(repo_ids, &CancellationToken::new()).await
    }

    /// Like [`run`](Self::run), but stops early once `cancel` fires or the
    /// configured run timeout elapses. Repositories that were not resolved by
    /// then come back as `Cancelled` failures, so the result still holds one
    /// outcome per (deduplicated) input id, in input order.
    pub async fn run_until_cancelled(
        &self,
        repo_ids: &[RepoId],
        cancel: &CancellationToken,
    ) -> Vec<FetchOutcome> {
        let repo_ids = dedup(repo_ids);
        // Child token so the run timeout never cancels the caller's token
        let cancel = cancel.child_token();
        let _stop_timer = cancel.clone().drop_guard();

        if let Some(limit) = self.config.run_timeout {
            let token = cancel.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = tokio::time::sleep(limit) => {
                        tracing::warn!("Run timeout of {:?} reached, cancelling pending work", limit);
                        token.cancel();
                    }
                    _ = token.cancelled() => {}
                }
            });
        }

        tracing::info!(
            "Fetching {} data for {} repositories (concurrency {})",
            self.kind,
            repo_ids.len(),
            self.config.concurrency_limit
        );

        let gates = Gates {
            repo: RateLimiter::fixed_interval(self.config.batch_delay),
            request: RateLimiter::new(std::time::Duration::ZERO, self.config.requests_per_minute),
        };
        let semaphore = Semaphore::new(self.config.concurrency_limit.max(1));
        let pb = self.progress_bar(repo_ids.len());

        let gates = &gates;
        let semaphore = &semaphore;
        let cancel_ref = &cancel;
        let pb_ref = &pb;

        // join_all keeps input order regardless of completion order
        let tasks = repo_ids.iter().map(|repo_id| async move {
            let outcome = tokio::select! {
                biased;
                _ = cancel_ref.cancelled() => FetchOutcome::cancelled(repo_id, 0),
                permit = semaphore.acquire() => match permit {
                    Ok(_permit) => self.fetch_repo(repo_id, gates, cancel_ref).await,
                    Err(_) => FetchOutcome::cancelled(repo_id, 0),
                },
            };
            pb_ref.inc(1);
            outcome
        });

        let outcomes = join_all(tasks).await;
        pb.finish_and_clear();

        let succeeded = outcomes.iter().filter(|o| o.is_success()).count();
        tracing::info!(
            "Fetch finished: {} succeeded, {} failed",
            succeeded,
            outcomes.len() - succeeded
        );

        outcomes
    }

    async fn fetch_repo(&self, repo_id: &str, gates: &Gates, cancel: &CancellationToken) -> FetchOutcome {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return FetchOutcome::cancelled(repo_id, 0),
            _ = gates.repo.wait() => {}
        }

        let paginator = Paginator::new(self.fetcher.as_ref(), &gates.request, self.kind, &self.filter)
            .page_size(self.config.page_size)
            .max_pages(self.config.max_pages)
            .timeout(self.config.request_timeout);
        let attempts = AtomicU32::new(0);
        let max_attempts = self.config.retry.max_attempts;

        let paginator = &paginator;
        let attempts_ref = &attempts;
        let attempt = move || async move {
            attempts_ref.fetch_add(1, Ordering::Relaxed);
            paginator.fetch_all(repo_id).await
        };

        let retrying = attempt
            .retry(self.config.retry.into_backoff())
            .sleep(tokio::time::sleep)
            .when(FetchError::is_retryable)
            .notify(|err: &FetchError, delay| {
                tracing::warn!(
                    "Repo {} attempt {}/{} failed: {}; retrying in {:?}",
                    repo_id,
                    attempts_ref.load(Ordering::Relaxed),
                    max_attempts,
                    err,
                    delay
                );
            });

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(FetchError::Cancelled),
            result = retrying => result,
        };
        let attempts_made = attempts.load(Ordering::Relaxed);

        match result {
            Ok(pages) => {
                tracing::info!(
                    "Repo {}: {} records over {} pages",
                    repo_id,
                    pages.records.len(),
                    pages.page_count
                );
                FetchOutcome::Success {
                    repo_id: repo_id.to_string(),
                    records: pages.records,
                    page_count: pages.page_count,
                }
            }
            Err(FetchError::Cancelled) => {
                tracing::warn!("Repo {} cancelled after {} attempts", repo_id, attempts_made);
                FetchOutcome::cancelled(repo_id, attempts_made)
            }
            Err(err) => {
                tracing::error!(
                    "Repo {} failed after {} attempts: {}",
                    repo_id,
                    attempts_made,
                    err
                );
                FetchOutcome::failure(repo_id, &err, attempts_made)
            }
        }
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.config.show_progress {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(len as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} repos")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb
    }
}

/// Drop repeated ids, keeping the first occurrence in place.
fn dedup(repo_ids: &[RepoId]) -> Vec<RepoId> {
    let mut seen = HashSet::new();
    repo_ids
        .iter()
        .filter(|id| {
            let first = seen.insert(id.as_str());
            if !first {
                tracing::warn!("Duplicate repo id {} ignored", id);
            }
            first
        })
        .cloned()
        .collect()
}
