use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::tally::TeamCounts;
use crate::timer::mm_ss;

/// Final record of an officiated match, handed to the submission outbox
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchSummary {
    pub match_id: String,
    pub home_team: String,
    pub away_team: String,
    /// First half including added time, in whole seconds
    pub first_half_duration_secs: u64,
    /// Second half on its own (not the cumulative clock), including added time
    pub second_half_duration_secs: u64,
    pub home_score: u32,
    pub away_score: u32,
    pub total_distance_meters: f64,
    pub yellow_cards: TeamCounts,
    pub red_cards: TeamCounts,
    pub finished_at: DateTime<Utc>,
}

impl MatchSummary {
    pub fn first_half_display(&self) -> String {
        mm_ss(self.first_half_duration_secs)
    }

    pub fn second_half_display(&self) -> String {
        mm_ss(self.second_half_duration_secs)
    }

    /// Distance in km with two decimals, e.g. `"8.42 km"`.
    pub fn distance_display(&self) -> String {
        format!("{:.2} km", self.total_distance_meters / 1000.0)
    }
}
