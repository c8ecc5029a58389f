// Integration tests for match result submission
//
// The outbox is exercised against a scripted submitter; the HTTP submitter
// against a throwaway axum server on a local port.

use anyhow::{bail, Result};
use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use chrono::Utc;
use reftrack::config::SubmissionConfig;
use reftrack::phase::{MatchSummary, TeamCounts};
use reftrack::submit::{HttpSubmitter, OutboxState, ResultSubmitter, SubmissionOutbox};
use serde_json::Value;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

fn summary() -> MatchSummary {
    MatchSummary {
        match_id: "match-11".to_string(),
        home_team: "Jablonec".to_string(),
        away_team: "Teplice".to_string(),
        first_half_duration_secs: 2760,
        second_half_duration_secs: 2880,
        home_score: 1,
        away_score: 0,
        total_distance_meters: 10_250.0,
        yellow_cards: TeamCounts { home: 0, away: 2 },
        red_cards: TeamCounts { home: 0, away: 1 },
        finished_at: Utc::now(),
    }
}

/// Fails a fixed number of times, then accepts
struct FlakySubmitter {
    failures: u32,
    calls: AtomicU32,
}

impl FlakySubmitter {
    fn new(failures: u32) -> Self {
        Self {
            failures,
            calls: AtomicU32::new(0),
        }
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ResultSubmitter for FlakySubmitter {
    async fn submit(&self, _summary: &MatchSummary) -> Result<()> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if call <= self.failures {
            bail!("Network unreachable");
        }
        Ok(())
    }
}

#[tokio::test]
async fn test_failed_submission_keeps_summary() {
    let submitter = FlakySubmitter::new(1);
    let mut outbox = SubmissionOutbox::new(summary());

    assert!(outbox.submit(&submitter).await.is_err());
    assert_eq!(outbox.state(), OutboxState::Pending);
    assert_eq!(outbox.attempts(), 1);
    assert!(outbox.last_error().is_some_and(|e| e.contains("Network unreachable")));
    assert_eq!(outbox.summary().match_id, "match-11");

    assert!(outbox.submit(&submitter).await.is_ok());
    assert_eq!(outbox.state(), OutboxState::Submitted);
    assert_eq!(outbox.attempts(), 2);
    assert_eq!(outbox.last_error(), None);

    // Already delivered: no further calls
    assert!(outbox.submit(&submitter).await.is_ok());
    assert_eq!(submitter.calls(), 2);
}

#[tokio::test(start_paused = true)]
async fn test_retry_until_success() {
    let submitter = FlakySubmitter::new(2);
    let mut outbox = SubmissionOutbox::new(summary());

    outbox
        .submit_with_retry(&submitter, 3, Duration::from_secs(2))
        .await
        .unwrap();
    assert_eq!(outbox.state(), OutboxState::Submitted);
    assert_eq!(outbox.attempts(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_retry_gives_up_after_max_attempts() {
    let submitter = FlakySubmitter::new(5);
    let mut outbox = SubmissionOutbox::new(summary());

    let result = outbox
        .submit_with_retry(&submitter, 2, Duration::from_secs(2))
        .await;
    assert!(result.is_err());
    assert_eq!(outbox.state(), OutboxState::Pending, "Still retryable later");
    assert_eq!(submitter.calls(), 2);
}

#[tokio::test]
async fn test_abandon_drops_pending_summary() {
    let submitter = FlakySubmitter::new(1);
    let mut outbox = SubmissionOutbox::new(summary());
    let _ = outbox.submit(&submitter).await;

    let unsent = outbox.abandon();
    assert_eq!(unsent.map(|s| s.match_id), Some("match-11".to_string()));
    assert_eq!(outbox.state(), OutboxState::Abandoned);

    assert!(outbox.submit(&submitter).await.is_err());
    assert_eq!(submitter.calls(), 1);
    assert!(outbox.abandon().is_none());
}

#[tokio::test]
async fn test_abandon_after_delivery_is_noop() {
    let submitter = FlakySubmitter::new(0);
    let mut outbox = SubmissionOutbox::new(summary());
    outbox.submit(&submitter).await.unwrap();

    assert!(outbox.abandon().is_none());
    assert_eq!(outbox.state(), OutboxState::Submitted);
}

type Received = Arc<Mutex<Vec<Value>>>;

async fn results_backend(status: StatusCode) -> Result<(String, Received)> {
    let received: Received = Arc::default();

    let app = Router::new()
        .route(
            "/results",
            post(
                move |State(received): State<Received>, Json(body): Json<Value>| async move {
                    received.lock().unwrap().push(body);
                    status
                },
            ),
        )
        .with_state(Arc::clone(&received));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    Ok((format!("http://{}/results", addr), received))
}

#[tokio::test]
async fn test_http_submitter_posts_summary_with_user() -> Result<()> {
    let (endpoint, received) = results_backend(StatusCode::OK).await?;
    let config = SubmissionConfig {
        endpoint,
        timeout_secs: 5,
        max_attempts: 1,
    };

    let submitter = HttpSubmitter::new(&config, "ref-1")?;
    submitter.submit(&summary()).await?;

    let bodies = received.lock().unwrap().clone();
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["user_id"], "ref-1");
    assert_eq!(bodies[0]["match_id"], "match-11");
    assert_eq!(bodies[0]["home_score"], 1);
    assert_eq!(bodies[0]["red_cards"]["away"], 1);

    Ok(())
}

#[tokio::test]
async fn test_http_submitter_reports_server_errors() -> Result<()> {
    let (endpoint, _received) = results_backend(StatusCode::INTERNAL_SERVER_ERROR).await?;
    let config = SubmissionConfig {
        endpoint,
        timeout_secs: 5,
        max_attempts: 1,
    };

    let submitter = HttpSubmitter::new(&config, "ref-1")?;
    let mut outbox = SubmissionOutbox::new(summary());
    assert!(outbox.submit(&submitter).await.is_err());
    assert_eq!(outbox.state(), OutboxState::Pending);
    assert!(outbox.last_error().is_some_and(|e| e.contains("500")));

    Ok(())
}
