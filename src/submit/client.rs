use anyhow::{bail, Context, Result};
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::SubmissionConfig;
use crate::phase::MatchSummary;

/// Sends a finished match to the results backend
#[async_trait::async_trait]
pub trait ResultSubmitter: Send + Sync {
    async fn submit(&self, summary: &MatchSummary) -> Result<()>;
}

#[derive(Debug, Serialize)]
struct SubmissionRequest<'a> {
    user_id: &'a str,
    #[serde(flatten)]
    summary: &'a MatchSummary,
}

/// Posts the summary as JSON to the configured endpoint
pub struct HttpSubmitter {
    http_client: reqwest::Client,
    endpoint: String,
    user_id: String,
}

impl HttpSubmitter {
    pub fn new(config: &SubmissionConfig, user_id: impl Into<String>) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!("reftrack/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            http_client,
            endpoint: config.endpoint.clone(),
            user_id: user_id.into(),
        })
    }
}

#[async_trait::async_trait]
impl ResultSubmitter for HttpSubmitter {
    async fn submit(&self, summary: &MatchSummary) -> Result<()> {
        debug!(match_id = %summary.match_id, url = %self.endpoint, "Submitting match result");

        let response = self
            .http_client
            .post(&self.endpoint)
            .json(&SubmissionRequest {
                user_id: &self.user_id,
                summary,
            })
            .send()
            .await
            .context("Result submission failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Results backend answered {}: {}", status, body);
        }

        info!("Match {} submitted", summary.match_id);
        Ok(())
    }
}
