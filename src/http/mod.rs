//! HTTP control API for a headless match runtime
//!
//! Endpoints:
//! - POST /matches - Kick off a match
//! - POST /matches/:id/commands - Referee input (end half, confirm, goals, ...)
//! - GET /matches/:id - Current match snapshot
//! - DELETE /matches/:id - Leave the match, dropping any unsent result
//! - GET /matches/:id/summary - Final record after full time
//! - POST /matches/:id/submit - (Re)try sending the result
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::{AppState, DepsFactory, MatchEntry, SubmitterFactory};
