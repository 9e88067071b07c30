//! Job search API client.

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use jobchat_core::config::SearchConfig;
use jobchat_core::types::{JobSummary, SearchCriteria};

use crate::error::ClientError;

/// Structured job retrieval.
///
/// A filter in, a ranked (possibly empty) list of matching jobs out.
#[async_trait]
pub trait JobSearch: Send + Sync {
    async fn search(&self, criteria: &SearchCriteria) -> Result<Vec<JobSummary>, ClientError>;
}

/// Client for the portal's advanced search endpoint.
pub struct HttpJobSearch {
    client: Client,
    base_url: String,
}

impl HttpJobSearch {
    pub fn new(config: &SearchConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl JobSearch for HttpJobSearch {
    async fn search(&self, criteria: &SearchCriteria) -> Result<Vec<JobSummary>, ClientError> {
        let endpoint = format!("{}/api/jobs/search-advanced", self.base_url);
        debug!(endpoint = %endpoint, ?criteria, "Searching jobs");

        let response = self.client.post(&endpoint).json(criteria).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                endpoint,
                status: status.as_u16(),
            });
        }

        let jobs: Vec<JobSummary> = response.json().await?;
        debug!(matches = jobs.len(), "Search completed");
        Ok(jobs)
    }
}
