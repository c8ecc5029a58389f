use super::state::AppState;
use crate::phase::{MatchCommand, MatchSummary};
use crate::session::{Authorization, MatchInfo};
use crate::submit::{OutboxState, SubmissionOutbox};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct StartMatchRequest {
    pub match_id: String,
    pub home_team: String,
    pub away_team: String,
    /// Signed-in referee; the match is refused without one
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct StartMatchResponse {
    pub match_id: String,
    pub session_id: String,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub match_id: String,
    pub state: OutboxState,
    pub attempts: u32,
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AbandonResponse {
    pub match_id: String,
    pub status: String,
    /// Result that was dropped without being delivered
    pub unsent: Option<MatchSummary>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(status: StatusCode, error: String) -> Response {
    (status, Json(ErrorResponse { error })).into_response()
}

fn not_found(match_id: &str) -> Response {
    error_response(StatusCode::NOT_FOUND, format!("Match {} not found", match_id))
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /matches
/// Kick off a match
pub async fn start_match(
    State(state): State<AppState>,
    Json(req): Json<StartMatchRequest>,
) -> impl IntoResponse {
    let info = MatchInfo::new(req.match_id, req.home_team, req.away_team);
    let auth = match req.user_id {
        Some(user_id) => Authorization::signed_in(user_id),
        None => Authorization::default(),
    };

    info!("Starting match: {}", info.match_id);

    if auth.user().is_none() {
        return error_response(
            StatusCode::UNAUTHORIZED,
            format!("Match {} refused: not signed in", info.match_id),
        );
    }

    let entry = match state.start_match(info.clone(), &auth).await {
        Ok(entry) => entry,
        Err(e) => {
            warn!("Refused to start match {}: {:#}", info.match_id, e);
            // The duplicate check runs first, so a registered ID means a conflict
            let status = if state.get(&info.match_id).await.is_some() {
                StatusCode::CONFLICT
            } else {
                StatusCode::BAD_REQUEST
            };
            return error_response(status, format!("{:#}", e));
        }
    };

    (
        StatusCode::OK,
        Json(StartMatchResponse {
            match_id: info.match_id,
            session_id: entry.live.session_id().to_string(),
            status: "running".to_string(),
        }),
    )
        .into_response()
}

/// POST /matches/:match_id/commands
/// Referee input
pub async fn send_command(
    State(state): State<AppState>,
    Path(match_id): Path<String>,
    Json(command): Json<MatchCommand>,
) -> impl IntoResponse {
    let Some(entry) = state.get(&match_id).await else {
        return not_found(&match_id);
    };

    match entry.live.send(command).await {
        Ok(()) => StatusCode::ACCEPTED.into_response(),
        Err(e) => error_response(StatusCode::CONFLICT, format!("{:#}", e)),
    }
}

/// GET /matches/:match_id
/// Current snapshot of a match
pub async fn get_match_status(
    State(state): State<AppState>,
    Path(match_id): Path<String>,
) -> impl IntoResponse {
    match state.get(&match_id).await {
        Some(entry) => (StatusCode::OK, Json(entry.live.snapshot())).into_response(),
        None => not_found(&match_id),
    }
}

/// GET /matches/:match_id/summary
/// Final record once the match has ended
pub async fn get_match_summary(
    State(state): State<AppState>,
    Path(match_id): Path<String>,
) -> impl IntoResponse {
    let Some(entry) = state.get(&match_id).await else {
        return not_found(&match_id);
    };

    match entry.live.summary() {
        Some(summary) => (StatusCode::OK, Json(summary)).into_response(),
        None => error_response(
            StatusCode::CONFLICT,
            format!("Match {} is still in progress", match_id),
        ),
    }
}

/// POST /matches/:match_id/submit
/// Send the result; safe to call again after a failure
pub async fn submit_match(
    State(state): State<AppState>,
    Path(match_id): Path<String>,
) -> impl IntoResponse {
    let Some(entry) = state.get(&match_id).await else {
        return not_found(&match_id);
    };

    let mut guard = entry.outbox.lock().await;
    if guard.is_none() {
        match entry.live.summary() {
            Some(summary) => *guard = Some(SubmissionOutbox::new(summary)),
            None => {
                return error_response(
                    StatusCode::CONFLICT,
                    format!("Match {} is still in progress", match_id),
                )
            }
        }
    }
    let Some(outbox) = guard.as_mut() else {
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "Outbox missing".to_string());
    };

    let submitter = match (state.submitter)(entry.live.user_id()) {
        Ok(submitter) => submitter,
        Err(e) => {
            error!("Failed to create submitter: {:#}", e);
            return error_response(StatusCode::INTERNAL_SERVER_ERROR, format!("{:#}", e));
        }
    };

    let status = match outbox.submit(submitter.as_ref()).await {
        Ok(()) => StatusCode::OK,
        Err(_) => StatusCode::BAD_GATEWAY,
    };

    (
        status,
        Json(SubmitResponse {
            match_id,
            state: outbox.state(),
            attempts: outbox.attempts(),
            error: outbox.last_error().map(str::to_string),
        }),
    )
        .into_response()
}

/// DELETE /matches/:match_id
/// Leave the match; an unsent result is dropped
pub async fn abandon_match(
    State(state): State<AppState>,
    Path(match_id): Path<String>,
) -> impl IntoResponse {
    let entry = {
        let mut matches = state.matches.write().await;
        matches.remove(&match_id)
    };

    let Some(entry) = entry else {
        return not_found(&match_id);
    };

    entry.live.dismiss().await;

    let unsent = match entry.outbox.lock().await.as_mut() {
        Some(outbox) => outbox.abandon(),
        // Never submitted at all
        None => entry.live.summary(),
    };

    info!("Match {} abandoned", match_id);

    (
        StatusCode::OK,
        Json(AbandonResponse {
            match_id,
            status: "abandoned".to_string(),
            unsent,
        }),
    )
        .into_response()
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
