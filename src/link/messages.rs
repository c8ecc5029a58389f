use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::phase::{MatchPhase, MatchSummary};
use crate::session::MatchInfo;

/// Watch -> phone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WatchMessage {
    MatchStarted {
        match_id: String,
        home_team: String,
        away_team: String,
    },
    PhaseChanged {
        match_id: String,
        phase: MatchPhase,
        elapsed_secs: u64,
    },
    ScoreChanged {
        match_id: String,
        home_score: u32,
        away_score: u32,
    },
    MatchFinished {
        summary: MatchSummary,
    },
}

/// Phone -> watch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PhoneMessage {
    StartMatch {
        match_id: String,
        home_team: String,
        away_team: String,
    },
    SignedIn {
        user_id: String,
    },
    SignedOut,
}

impl PhoneMessage {
    /// Parse and check an inbound payload before anything acts on it.
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let message: PhoneMessage = serde_json::from_slice(payload)?;
        message.validate()?;
        Ok(message)
    }

    pub fn validate(&self) -> Result<()> {
        match self {
            Self::StartMatch {
                match_id,
                home_team,
                away_team,
            } => MatchInfo::new(match_id, home_team, away_team).validate(),
            Self::SignedIn { user_id } => {
                if user_id.trim().is_empty() {
                    bail!("Sign-in without a user ID");
                }
                Ok(())
            }
            Self::SignedOut => Ok(()),
        }
    }
}
