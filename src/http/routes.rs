use super::handlers;
use super::state::AppState;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;

/// Create the HTTP router with all routes
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        // Match control
        .route("/matches", post(handlers::start_match))
        .route(
            "/matches/:match_id",
            get(handlers::get_match_status).delete(handlers::abandon_match),
        )
        .route("/matches/:match_id/commands", post(handlers::send_command))
        // Results
        .route("/matches/:match_id/summary", get(handlers::get_match_summary))
        .route("/matches/:match_id/submit", post(handlers::submit_match))
        // Add tracing middleware for request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
