use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a match is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPhase {
    NotStarted,
    FirstHalf,
    FirstHalfOvertime,
    HalfTimePause,
    /// Pause is over; waiting for the whistle (or a tap) to restart play
    HalfTimePauseEnding,
    SecondHalf,
    SecondHalfOvertime,
    Ended,
}

impl MatchPhase {
    pub fn is_overtime(self) -> bool {
        matches!(self, Self::FirstHalfOvertime | Self::SecondHalfOvertime)
    }

    /// Play is live: exactly one of the two clocks is running.
    pub fn is_playing(self) -> bool {
        matches!(
            self,
            Self::FirstHalf | Self::FirstHalfOvertime | Self::SecondHalf | Self::SecondHalfOvertime
        )
    }

    pub fn is_first_half(self) -> bool {
        matches!(self, Self::FirstHalf | Self::FirstHalfOvertime)
    }

    pub fn is_second_half(self) -> bool {
        matches!(self, Self::SecondHalf | Self::SecondHalfOvertime)
    }

    pub fn is_pause(self) -> bool {
        matches!(self, Self::HalfTimePause | Self::HalfTimePauseEnding)
    }

    /// Label shown above the main clock.
    pub fn half_label(self) -> &'static str {
        match self {
            Self::NotStarted => "kick-off",
            Self::FirstHalf | Self::FirstHalfOvertime => "1st half",
            Self::HalfTimePause | Self::HalfTimePauseEnding => "half-time",
            Self::SecondHalf | Self::SecondHalfOvertime => "2nd half",
            Self::Ended => "full time",
        }
    }
}

impl fmt::Display for MatchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotStarted => "not started",
            Self::FirstHalf => "first half",
            Self::FirstHalfOvertime => "first half (added time)",
            Self::HalfTimePause => "half-time pause",
            Self::HalfTimePauseEnding => "half-time pause ending",
            Self::SecondHalf => "second half",
            Self::SecondHalfOvertime => "second half (added time)",
            Self::Ended => "ended",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseTransition {
    pub from: MatchPhase,
    pub to: MatchPhase,
}
