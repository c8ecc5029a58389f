use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

/// Identity of the match being officiated, supplied by the match list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchInfo {
    pub match_id: String,
    pub home_team: String,
    pub away_team: String,
}

impl MatchInfo {
    pub fn new(
        match_id: impl Into<String>,
        home_team: impl Into<String>,
        away_team: impl Into<String>,
    ) -> Self {
        Self {
            match_id: match_id.into(),
            home_team: home_team.into(),
            away_team: away_team.into(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.match_id.trim().is_empty() {
            bail!("Match ID is empty");
        }
        if self.home_team.trim().is_empty() || self.away_team.trim().is_empty() {
            bail!("Match {} is missing a team name", self.match_id);
        }
        Ok(())
    }
}

/// Login state handed over by the sign-in flow
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Authorization {
    pub is_logged_in: bool,
    pub user_id: Option<String>,
}

impl Authorization {
    pub fn signed_in(user_id: impl Into<String>) -> Self {
        Self {
            is_logged_in: true,
            user_id: Some(user_id.into()),
        }
    }

    /// The user ID, if this authorizes a match session at all.
    pub fn user(&self) -> Option<&str> {
        if !self.is_logged_in {
            return None;
        }
        self.user_id.as_deref().filter(|id| !id.trim().is_empty())
    }
}
