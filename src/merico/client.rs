use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client};

use crate::error::{FetchError, Result};
use crate::merico::request::RequestPayload;
use crate::merico::response::PageResponse;

// One attempt at one page. Retries, pacing and pagination live in the callers.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch_page(
        &self,
        request: &RequestPayload,
        timeout: Duration,
    ) -> std::result::Result<PageResponse, FetchError>;
}

pub struct MericoClient {
    client: Client,
    endpoint: String,
}

impl MericoClient {
    pub fn new(endpoint: &str, token: &str) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        let mut auth = header::HeaderValue::from_str(&format!("Bearer {}", token))?;
        auth.set_sensitive(true);
        headers.insert(header::AUTHORIZATION, auth);
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_static(concat!("merico-agent/", env!("CARGO_PKG_VERSION"))),
        );

        let client = Client::builder().default_headers(headers).build()?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn send(&self, request: &RequestPayload) -> std::result::Result<PageResponse, FetchError> {
        let response = self.client.post(&self.endpoint).json(request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::debug!(
                "Repo {} page {} rejected: {} - {}",
                request.repo_id(),
                request.page(),
                status,
                body
            );
            return Err(FetchError::Http(status));
        }

        let body = response.bytes().await?;
        PageResponse::from_slice(&body)
    }
}

#[async_trait]
impl PageFetcher for MericoClient {
    async fn fetch_page(
        &self,
        request: &RequestPayload,
        timeout: Duration,
    ) -> std::result::Result<PageResponse, FetchError> {
        tracing::debug!("Fetching repo {} page {}", request.repo_id(), request.page());
        // Covers connect, send and body read as one budget
        tokio::time::timeout(timeout, self.send(request))
            .await
            .map_err(|_| FetchError::Timeout)?
    }
}
