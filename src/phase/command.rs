use serde::{Deserialize, Serialize};

use super::phase::MatchPhase;
use super::tally::{TallyKind, Team};

/// Things the referee can do from the wrist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum MatchCommand {
    /// Tap on the clock: asks to end the current half (or the match)
    RequestEndPeriod,
    /// Asks to cut the half-time pause short
    RequestSkipPause,
    Confirm,
    Cancel,
    /// Tap on the "ready for second half" screen
    StartSecondHalf,
    Increment { kind: TallyKind, team: Team },
    Decrement { kind: TallyKind, team: Team },
}

/// A destructive action waiting for the referee to confirm it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confirmation {
    EndFirstHalf,
    EndMatch,
    SkipPause,
}

impl Confirmation {
    pub fn applies_to(self, phase: MatchPhase) -> bool {
        match self {
            Self::EndFirstHalf => phase.is_first_half(),
            Self::EndMatch => phase.is_second_half(),
            Self::SkipPause => phase == MatchPhase::HalfTimePause,
        }
    }

    pub fn prompt(self) -> &'static str {
        match self {
            Self::EndFirstHalf => "End the first half?",
            Self::EndMatch => "End the match?",
            Self::SkipPause => "Skip the rest of the pause?",
        }
    }
}

impl std::str::FromStr for MatchCommand {
    type Err = anyhow::Error;

    /// Console shorthand: `end`, `skip`, `yes`, `no`, `go`, `goal home`,
    /// `-goal home`, `yellow away`, `-red home`, ...
    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let head = words.next().unwrap_or_default().to_ascii_lowercase();
        let team = words.next().map(str::to_ascii_lowercase);

        let simple = match head.as_str() {
            "end" => Some(Self::RequestEndPeriod),
            "skip" => Some(Self::RequestSkipPause),
            "yes" | "ok" | "confirm" => Some(Self::Confirm),
            "no" | "cancel" => Some(Self::Cancel),
            "go" | "start" => Some(Self::StartSecondHalf),
            _ => None,
        };
        if let Some(command) = simple {
            return Ok(command);
        }

        let (decrement, name) = match head.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, head.as_str()),
        };
        let kind = match name {
            "goal" => TallyKind::Goal,
            "yellow" => TallyKind::YellowCard,
            "red" => TallyKind::RedCard,
            _ => anyhow::bail!("Unknown command: {:?}", line.trim()),
        };
        let team = match team.as_deref() {
            Some("home") | Some("h") => Team::Home,
            Some("away") | Some("a") => Team::Away,
            _ => anyhow::bail!("Say which team: {} home|away", name),
        };

        Ok(if decrement {
            Self::Decrement { kind, team }
        } else {
            Self::Increment { kind, team }
        })
    }
}
