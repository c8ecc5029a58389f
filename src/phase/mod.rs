//! Match phase state machine
//!
//! Drives the half/added-time/pause progression of one match, owns the
//! main, added-time and pause clocks, and collects score and cards. Every
//! operation that does not apply to the current phase is silently ignored.

mod command;
mod machine;
mod phase;
mod snapshot;
mod summary;
mod tally;

pub use command::{Confirmation, MatchCommand};
pub use machine::PhaseMachine;
pub use phase::{MatchPhase, PhaseTransition};
pub use snapshot::{MatchSnapshot, Notice};
pub use summary::MatchSummary;
pub use tally::{Tally, TallyKind, Team, TeamCounts};
