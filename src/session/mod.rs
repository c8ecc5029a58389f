//! Live match sessions
//!
//! This module provides the `LiveMatch` runtime that ties together:
//! - The phase state machine and its clocks
//! - Whistle detection during the half-time pause
//! - Distance tracking and the workout hand-off
//! - Progress messages to the paired phone

mod config;
mod session;

pub use config::{Authorization, MatchInfo};
pub use session::{LiveMatch, MatchDeps, SessionConfig};
