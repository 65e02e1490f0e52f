use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

/// Outcome of one fetch attempt. Network failures, timeouts and non-success
/// statuses are values, not errors: the pipeline's retry accounting treats
/// them all the same way.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    Fetched(Vec<u8>),
    Failed { reason: String },
}

/// Retrieves raw source bytes for a URL.
#[async_trait]
pub trait ImageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> FetchOutcome;
}

/// HTTP fetcher with a bounded per-request timeout.
pub struct HttpFetcher {
    http: Client,
    timeout: Duration,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Self {
        Self {
            http: Client::new(),
            timeout,
        }
    }
}

#[async_trait]
impl ImageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> FetchOutcome {
        let response = match self.http.get(url).timeout(self.timeout).send().await {
            Ok(response) => response,
            Err(e) => {
                return FetchOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        };

        let status = response.status();
        if !status.is_success() {
            return FetchOutcome::Failed {
                reason: format!("HTTP status {status}"),
            };
        }

        match response.bytes().await {
            Ok(bytes) => FetchOutcome::Fetched(bytes.to_vec()),
            Err(e) => FetchOutcome::Failed {
                reason: e.to_string(),
            },
        }
    }
}
