use anyhow::{bail, Result};
use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

use super::client::ResultSubmitter;
use crate::phase::MatchSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutboxState {
    Pending,
    Submitted,
    Abandoned,
}

/// Holds a finished match until it is delivered or the referee gives up on it
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionOutbox {
    summary: MatchSummary,
    state: OutboxState,
    attempts: u32,
    last_error: Option<String>,
}

impl SubmissionOutbox {
    pub fn new(summary: MatchSummary) -> Self {
        Self {
            summary,
            state: OutboxState::Pending,
            attempts: 0,
            last_error: None,
        }
    }

    pub fn summary(&self) -> &MatchSummary {
        &self.summary
    }

    pub fn state(&self) -> OutboxState {
        self.state
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// One delivery attempt. On failure the summary stays pending.
    pub async fn submit(&mut self, submitter: &dyn ResultSubmitter) -> Result<()> {
        match self.state {
            OutboxState::Submitted => return Ok(()),
            OutboxState::Abandoned => bail!("Match {} was abandoned", self.summary.match_id),
            OutboxState::Pending => {}
        }

        self.attempts += 1;
        match submitter.submit(&self.summary).await {
            Ok(()) => {
                self.state = OutboxState::Submitted;
                self.last_error = None;
                Ok(())
            }
            Err(e) => {
                warn!(
                    "Submitting match {} failed (attempt {}): {:#}",
                    self.summary.match_id, self.attempts, e
                );
                self.last_error = Some(format!("{:#}", e));
                Err(e)
            }
        }
    }

    /// Up to `max_attempts` tries with a doubling pause in between.
    pub async fn submit_with_retry(
        &mut self,
        submitter: &dyn ResultSubmitter,
        max_attempts: u32,
        first_backoff: Duration,
    ) -> Result<()> {
        let mut backoff = first_backoff;
        let mut tries = 0;
        loop {
            tries += 1;
            match self.submit(submitter).await {
                Ok(()) => return Ok(()),
                Err(e) if tries >= max_attempts.max(1) || self.state != OutboxState::Pending => {
                    return Err(e)
                }
                Err(_) => {
                    tokio::time::sleep(backoff).await;
                    backoff *= 2;
                }
            }
        }
    }

    /// Give up on delivery. Returns the summary if it had not been delivered.
    pub fn abandon(&mut self) -> Option<MatchSummary> {
        if self.state != OutboxState::Pending {
            return None;
        }
        info!("Match {} abandoned without submission", self.summary.match_id);
        self.state = OutboxState::Abandoned;
        Some(self.summary.clone())
    }
}
