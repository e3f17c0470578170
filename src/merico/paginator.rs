use std::time::Duration;

use crate::error::FetchError;
use crate::merico::client::PageFetcher;
use crate::merico::rate_limiter::RateLimiter;
use crate::merico::request::{AnalysisKind, Filter, RequestPayload};
use crate::models::FunctionRecord;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RepoPages {
    pub records: Vec<FunctionRecord>,
    pub page_count: u32,
}

pub struct Paginator<'a> {
    fetcher: &'a dyn PageFetcher,
    rate_limiter: &'a RateLimiter,
    kind: AnalysisKind,
    filter: &'a Filter,
    page_size: u32,
    max_pages: u32,
    timeout: Duration,
}

impl<'a> Paginator<'a> {
    pub fn new(
        fetcher: &'a dyn PageFetcher,
        rate_limiter: &'a RateLimiter,
        kind: AnalysisKind,
        filter: &'a Filter,
    ) -> Self {
        Self {
            fetcher,
            rate_limiter,
            kind,
            filter,
            page_size: 100,
            max_pages: 1000,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn fetch_all(&self, repo_id: &str) -> Result<RepoPages, FetchError> {
        let mut records = Vec::new();
        let mut page = 1;

        // Any page error aborts the whole walk; nothing partial is returned

        loop {
            self.rate_limiter.wait().await;

            let request = RequestPayload::new(self.kind, repo_id, page, self.page_size, self.filter);
            let response = self.fetcher.fetch_page(&request, self.timeout).await?;

            let items_count = response.records.len();
            records.extend(
                response
                    .records
                    .into_iter()
                    .map(|object| FunctionRecord::from_api_object(repo_id, object)),
            );

            // Stop on an empty or short page, or once the reported totals are reached
            let last_page = response.total_pages.is_some_and(|total| page >= total);
            let all_seen = response.total.is_some_and(|total| records.len() as u64 >= total);

            if items_count == 0 || last_page || all_seen || items_count < self.page_size as usize {
                break;
            }

            if page >= self.max_pages {
                tracing::warn!(
                    "Repo {} still has data after {} pages, stopping",
                    repo_id,
                    self.max_pages
                );
                break;
            }

            page += 1;
        }

        Ok(RepoPages {
            records,
            page_count: page,
        })
    }
}
