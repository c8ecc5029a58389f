use serde::{Deserialize, Serialize};

use super::command::Confirmation;
use super::phase::MatchPhase;
use super::tally::Tally;

/// Passive, non-fatal problems shown to the referee
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Notice {
    /// No audio input; the second half must be started by tap
    WhistleUnavailable,
    /// No location fix stream; distance will not be counted
    LocationUnavailable,
}

/// Everything a watch face needs to draw the match screen
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchSnapshot {
    pub match_id: String,
    pub home_team: String,
    pub away_team: String,
    pub phase: MatchPhase,
    pub half_label: String,
    pub elapsed_secs: u64,
    pub overtime_secs: u64,
    pub main_clock: String,
    /// `+MM:SS`, only during added time
    pub overtime_clock: Option<String>,
    /// Remaining half-time pause, only while it counts down
    pub pause_remaining: Option<String>,
    pub ready_for_second_half: bool,
    pub pending_confirmation: Option<Confirmation>,
    pub prompt: Option<String>,
    pub tally: Tally,
    pub total_distance_meters: f64,
    pub first_half_reported_secs: Option<u64>,
    pub notices: Vec<Notice>,
}
