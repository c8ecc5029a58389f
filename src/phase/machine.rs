use chrono::Utc;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{debug, info};

use super::command::{Confirmation, MatchCommand};
use super::phase::{MatchPhase, PhaseTransition};
use super::snapshot::{MatchSnapshot, Notice};
use super::summary::MatchSummary;
use super::tally::{Tally, TallyKind, Team};
use crate::config::{MatchTimerSettings, PauseExpiryPolicy};
use crate::session::MatchInfo;
use crate::timer::{mm_ss, ClockTick, CountdownTick, ElapsedClock, OvertimeClock, PauseCountdown};

/// State machine for a single match
///
/// Owns the phase, the three clocks and the tally. Distance is only read,
/// through the tracker's watch channel. After every change the current
/// [`MatchSnapshot`] is published to subscribers.
pub struct PhaseMachine {
    info: MatchInfo,
    settings: Arc<MatchTimerSettings>,
    phase: MatchPhase,
    clock: ElapsedClock,
    overtime: OvertimeClock,
    pause: PauseCountdown,
    tally: Tally,
    pending: Option<Confirmation>,
    first_half_reported: Option<u64>,
    summary: Option<MatchSummary>,
    notices: Vec<Notice>,
    distance: watch::Receiver<f64>,
    snapshot_tx: watch::Sender<MatchSnapshot>,
}

impl PhaseMachine {
    pub fn new(
        info: MatchInfo,
        settings: Arc<MatchTimerSettings>,
        distance: watch::Receiver<f64>,
    ) -> Self {
        let clock = ElapsedClock::new(settings.first_half_secs);
        let pause = PauseCountdown::new(settings.half_time_pause_secs);
        let (snapshot_tx, _) = watch::channel(Self::blank_snapshot(&info));

        let machine = Self {
            info,
            settings,
            phase: MatchPhase::NotStarted,
            clock,
            overtime: OvertimeClock::new(),
            pause,
            tally: Tally::default(),
            pending: None,
            first_half_reported: None,
            summary: None,
            notices: Vec::new(),
            distance,
            snapshot_tx,
        };
        machine.publish();
        machine
    }

    pub fn subscribe(&self) -> watch::Receiver<MatchSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Kick-off: NotStarted -> FirstHalf.
    pub fn start(&mut self) -> Option<PhaseTransition> {
        if self.phase != MatchPhase::NotStarted {
            return None;
        }

        info!(
            "Kick-off: {} vs {} (match {})",
            self.info.home_team, self.info.away_team, self.info.match_id
        );
        self.clock.set_boundary(self.settings.first_half_secs);
        self.clock.start();
        Some(self.enter(MatchPhase::FirstHalf))
    }

    /// One second of wall time has passed.
    pub fn on_tick(&mut self) -> Option<PhaseTransition> {
        let transition = match self.phase {
            MatchPhase::FirstHalf | MatchPhase::SecondHalf => match self.clock.tick() {
                ClockTick::BoundaryReached(_) => self.enter_overtime(),
                ClockTick::Ticked(_) | ClockTick::Idle => None,
            },
            MatchPhase::FirstHalfOvertime | MatchPhase::SecondHalfOvertime => {
                self.overtime.tick();
                None
            }
            MatchPhase::HalfTimePause => match self.pause.tick() {
                CountdownTick::Expired => self.pause_expired(),
                CountdownTick::Remaining(_) | CountdownTick::Idle => None,
            },
            // Nothing counts, but distance may still have moved
            MatchPhase::HalfTimePauseEnding => None,
            MatchPhase::NotStarted | MatchPhase::Ended => return None,
        };

        // The transition already published
        if transition.is_none() {
            self.publish();
        }
        transition
    }

    /// The whistle detector heard a whistle.
    ///
    /// Only restarts play once the pause is over; repeated events are no-ops.
    pub fn on_whistle(&mut self) -> Option<PhaseTransition> {
        if self.phase != MatchPhase::HalfTimePauseEnding {
            debug!("Whistle ignored in phase {}", self.phase);
            return None;
        }

        info!("Whistle detected, starting second half");
        self.begin_second_half()
    }

    pub fn apply(&mut self, command: MatchCommand) -> Option<PhaseTransition> {
        match command {
            MatchCommand::RequestEndPeriod => {
                let confirmation = if self.phase.is_first_half() {
                    Confirmation::EndFirstHalf
                } else if self.phase.is_second_half() {
                    Confirmation::EndMatch
                } else {
                    return None;
                };
                self.ask(confirmation);
                None
            }
            MatchCommand::RequestSkipPause => {
                if self.phase == MatchPhase::HalfTimePause {
                    self.ask(Confirmation::SkipPause);
                }
                None
            }
            MatchCommand::Confirm => self.confirm(),
            MatchCommand::Cancel => {
                if self.pending.take().is_some() {
                    self.publish();
                }
                None
            }
            MatchCommand::StartSecondHalf => {
                if self.phase != MatchPhase::HalfTimePauseEnding {
                    return None;
                }
                info!("Second half started by tap");
                self.begin_second_half()
            }
            MatchCommand::Increment { kind, team } => {
                self.update_tally(kind, team, true);
                None
            }
            MatchCommand::Decrement { kind, team } => {
                self.update_tally(kind, team, false);
                None
            }
        }
    }

    /// Show a passive notice (sensor unavailable and the like).
    pub fn add_notice(&mut self, notice: Notice) {
        if !self.notices.contains(&notice) {
            self.notices.push(notice);
            self.publish();
        }
    }

    pub fn phase(&self) -> MatchPhase {
        self.phase
    }

    pub fn info(&self) -> &MatchInfo {
        &self.info
    }

    pub fn main_clock(&self) -> &ElapsedClock {
        &self.clock
    }

    pub fn overtime_clock(&self) -> &OvertimeClock {
        &self.overtime
    }

    pub fn pause_countdown(&self) -> &PauseCountdown {
        &self.pause
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.clock.elapsed_seconds()
    }

    pub fn overtime_seconds(&self) -> u64 {
        self.overtime.overtime_seconds()
    }

    pub fn tally(&self) -> &Tally {
        &self.tally
    }

    pub fn pending_confirmation(&self) -> Option<Confirmation> {
        self.pending
    }

    pub fn first_half_reported_secs(&self) -> Option<u64> {
        self.first_half_reported
    }

    /// Available once the match has ended.
    pub fn summary(&self) -> Option<&MatchSummary> {
        self.summary.as_ref()
    }

    pub fn snapshot(&self) -> MatchSnapshot {
        let phase = self.phase;
        MatchSnapshot {
            match_id: self.info.match_id.clone(),
            home_team: self.info.home_team.clone(),
            away_team: self.info.away_team.clone(),
            phase,
            half_label: phase.half_label().to_string(),
            elapsed_secs: self.clock.elapsed_seconds(),
            overtime_secs: self.overtime.overtime_seconds(),
            main_clock: self.clock.formatted_time(),
            overtime_clock: phase
                .is_overtime()
                .then(|| format!("+{}", self.overtime.formatted_time())),
            pause_remaining: (phase == MatchPhase::HalfTimePause)
                .then(|| self.pause.formatted_time()),
            ready_for_second_half: phase == MatchPhase::HalfTimePauseEnding,
            pending_confirmation: self.pending,
            prompt: self.pending.map(|c| c.prompt().to_string()),
            tally: self.tally,
            total_distance_meters: *self.distance.borrow(),
            first_half_reported_secs: self.first_half_reported,
            notices: self.notices.clone(),
        }
    }

    fn ask(&mut self, confirmation: Confirmation) {
        debug!("Awaiting confirmation: {}", confirmation.prompt());
        self.pending = Some(confirmation);
        self.publish();
    }

    fn confirm(&mut self) -> Option<PhaseTransition> {
        let confirmation = self.pending.take()?;
        if !confirmation.applies_to(self.phase) {
            debug!("Dropping stale confirmation {:?} in {}", confirmation, self.phase);
            self.publish();
            return None;
        }

        match confirmation {
            Confirmation::EndFirstHalf => self.end_first_half(),
            Confirmation::EndMatch => self.end_match(),
            Confirmation::SkipPause => {
                info!("Half-time pause skipped with {} left", self.pause.formatted_time());
                self.pause.stop();
                Some(self.enter(MatchPhase::HalfTimePauseEnding))
            }
        }
    }

    fn enter_overtime(&mut self) -> Option<PhaseTransition> {
        let next = match self.phase {
            MatchPhase::FirstHalf => MatchPhase::FirstHalfOvertime,
            MatchPhase::SecondHalf => MatchPhase::SecondHalfOvertime,
            _ => return None,
        };

        self.overtime.start(&mut self.clock);
        Some(self.enter(next))
    }

    fn end_first_half(&mut self) -> Option<PhaseTransition> {
        let reported = self.clock.elapsed_seconds() + self.overtime.overtime_seconds();
        info!(
            "First half over after {} (match {})",
            mm_ss(reported),
            self.info.match_id
        );
        self.first_half_reported = Some(reported);

        self.clock.stop();
        self.overtime.stop();
        self.pause.start();
        Some(self.enter(MatchPhase::HalfTimePause))
    }

    fn pause_expired(&mut self) -> Option<PhaseTransition> {
        match self.settings.pause_expiry {
            PauseExpiryPolicy::WaitForTrigger => {
                info!("Pause over, waiting for whistle or tap");
                Some(self.enter(MatchPhase::HalfTimePauseEnding))
            }
            PauseExpiryPolicy::AutoContinue => self.begin_second_half(),
        }
    }

    fn begin_second_half(&mut self) -> Option<PhaseTransition> {
        self.pause.stop();
        self.clock.set_elapsed_seconds(self.settings.first_half_secs);
        self.clock.set_boundary(self.settings.full_time_secs());
        self.clock.start();
        Some(self.enter(MatchPhase::SecondHalf))
    }

    fn end_match(&mut self) -> Option<PhaseTransition> {
        let second_half = self
            .clock
            .elapsed_seconds()
            .saturating_sub(self.settings.first_half_secs)
            + self.overtime.overtime_seconds();

        self.clock.stop();
        self.overtime.stop();
        self.pause.stop();

        let summary = MatchSummary {
            match_id: self.info.match_id.clone(),
            home_team: self.info.home_team.clone(),
            away_team: self.info.away_team.clone(),
            first_half_duration_secs: self.first_half_reported.unwrap_or(0),
            second_half_duration_secs: second_half,
            home_score: self.tally.goals.home,
            away_score: self.tally.goals.away,
            total_distance_meters: *self.distance.borrow(),
            yellow_cards: self.tally.yellow_cards,
            red_cards: self.tally.red_cards,
            finished_at: Utc::now(),
        };

        info!(
            "Full time {}:{} (halves {} / {}, {}) match {}",
            summary.home_score,
            summary.away_score,
            summary.first_half_display(),
            summary.second_half_display(),
            summary.distance_display(),
            summary.match_id
        );
        self.summary = Some(summary);
        Some(self.enter(MatchPhase::Ended))
    }

    fn update_tally(&mut self, kind: TallyKind, team: Team, increment: bool) {
        if self.phase == MatchPhase::Ended {
            return;
        }

        let count = if increment {
            self.tally.increment(kind, team)
        } else {
            self.tally.decrement(kind, team)
        };
        debug!("{:?} {:?} now {}", team, kind, count);
        self.publish();
    }

    fn enter(&mut self, next: MatchPhase) -> PhaseTransition {
        let transition = PhaseTransition {
            from: self.phase,
            to: next,
        };
        info!("Phase: {} -> {}", transition.from, transition.to);

        self.phase = next;
        if self.pending.is_some_and(|c| !c.applies_to(next)) {
            self.pending = None;
        }
        self.publish();
        transition
    }

    fn publish(&self) {
        self.snapshot_tx.send_replace(self.snapshot());
    }

    fn blank_snapshot(info: &MatchInfo) -> MatchSnapshot {
        MatchSnapshot {
            match_id: info.match_id.clone(),
            home_team: info.home_team.clone(),
            away_team: info.away_team.clone(),
            phase: MatchPhase::NotStarted,
            half_label: MatchPhase::NotStarted.half_label().to_string(),
            elapsed_secs: 0,
            overtime_secs: 0,
            main_clock: mm_ss(0),
            overtime_clock: None,
            pause_remaining: None,
            ready_for_second_half: false,
            pending_confirmation: None,
            prompt: None,
            tally: Tally::default(),
            total_distance_meters: 0.0,
            first_half_reported_secs: None,
            notices: Vec::new(),
        }
    }
}
