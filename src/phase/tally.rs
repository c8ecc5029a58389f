use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Team {
    Home,
    Away,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TallyKind {
    Goal,
    YellowCard,
    RedCard,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamCounts {
    pub home: u32,
    pub away: u32,
}

impl TeamCounts {
    pub fn get(&self, team: Team) -> u32 {
        match team {
            Team::Home => self.home,
            Team::Away => self.away,
        }
    }

    fn slot(&mut self, team: Team) -> &mut u32 {
        match team {
            Team::Home => &mut self.home,
            Team::Away => &mut self.away,
        }
    }

    pub fn total(&self) -> u32 {
        self.home + self.away
    }
}

/// Goals and cards entered by the referee during play
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub goals: TeamCounts,
    pub yellow_cards: TeamCounts,
    pub red_cards: TeamCounts,
}

impl Tally {
    fn counts(&mut self, kind: TallyKind) -> &mut TeamCounts {
        match kind {
            TallyKind::Goal => &mut self.goals,
            TallyKind::YellowCard => &mut self.yellow_cards,
            TallyKind::RedCard => &mut self.red_cards,
        }
    }

    /// Returns the new count.
    pub fn increment(&mut self, kind: TallyKind, team: Team) -> u32 {
        let slot = self.counts(kind).slot(team);
        *slot = slot.saturating_add(1);
        *slot
    }

    /// Returns the new count; a zero count stays at zero.
    pub fn decrement(&mut self, kind: TallyKind, team: Team) -> u32 {
        let slot = self.counts(kind).slot(team);
        *slot = slot.saturating_sub(1);
        *slot
    }

    pub fn get(&self, kind: TallyKind, team: Team) -> u32 {
        match kind {
            TallyKind::Goal => self.goals.get(team),
            TallyKind::YellowCard => self.yellow_cards.get(team),
            TallyKind::RedCard => self.red_cards.get(team),
        }
    }
}
