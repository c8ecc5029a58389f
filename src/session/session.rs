use super::config::{Authorization, MatchInfo};
use crate::audio::{AudioBackend, AudioBackendConfig, AudioBackendFactory, AudioSource, WhistleDetector, WhistleEvent};
use crate::config::{AudioInputConfig, Config, LocationConfig, MatchTimerSettings};
use crate::link::{PhoneLink, WatchMessage};
use crate::location::{
    DiscardFitnessStore, DistanceTracker, FitnessStore, JsonLinesFitnessStore, LocationSample,
    LocationSource, SampleOutcome, TrackFileSource,
};
use crate::phase::{
    MatchCommand, MatchPhase, MatchSnapshot, MatchSummary, Notice, PhaseMachine, PhaseTransition,
};
use anyhow::{anyhow, Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// Settings a live match is started with
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub timing: Arc<MatchTimerSettings>,
    pub whistle_threshold: f32,
    pub location: LocationConfig,
}

impl SessionConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            timing: Arc::new(config.timing.clone()),
            whistle_threshold: config.whistle.detection_threshold,
            location: config.location.clone(),
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            timing: Arc::new(MatchTimerSettings::default()),
            whistle_threshold: 0.6,
            location: LocationConfig::default(),
        }
    }
}

/// Sensors and sinks a live match talks to
pub struct MatchDeps {
    /// `None` when no audio input could be set up
    pub audio: Option<Box<dyn AudioBackend>>,
    pub location: Option<Box<dyn LocationSource>>,
    pub fitness: Arc<dyn FitnessStore>,
    pub link: Option<Arc<dyn PhoneLink>>,
}

impl Default for MatchDeps {
    fn default() -> Self {
        Self {
            audio: None,
            location: None,
            fitness: Arc::new(DiscardFitnessStore),
            link: None,
        }
    }
}

impl MatchDeps {
    /// Build the inputs and sinks named in the config. Inputs that cannot be
    /// created are left out; the match then runs without them.
    pub fn from_config(config: &Config, link: Option<Arc<dyn PhoneLink>>) -> Self {
        let source = match &config.whistle.input {
            AudioInputConfig::Microphone => AudioSource::Microphone,
            AudioInputConfig::File { path } => AudioSource::File(path.clone()),
        };
        let backend_config = AudioBackendConfig {
            buffer_size: config.whistle.buffer_size,
            sample_rate: config.whistle.sample_rate,
            realtime: true,
        };
        let audio = match AudioBackendFactory::create(source, backend_config) {
            Ok(backend) => Some(backend),
            Err(e) => {
                warn!("Audio input unavailable: {:#}", e);
                None
            }
        };

        let location = config
            .location
            .track_file
            .as_ref()
            .map(|path| Box::new(TrackFileSource::new(path.clone(), true)) as Box<dyn LocationSource>);

        let fitness: Arc<dyn FitnessStore> = match config.fitness_log_path() {
            Some(path) => Arc::new(JsonLinesFitnessStore::new(path)),
            None => Arc::new(DiscardFitnessStore),
        };

        Self {
            audio,
            location,
            fitness,
            link,
        }
    }
}

/// A match being officiated
///
/// All match state lives in one task that serializes clock ticks, referee
/// commands, whistle events and location fixes. This handle only sends
/// commands in and watches snapshots come out.
pub struct LiveMatch {
    session_id: String,
    info: MatchInfo,
    user_id: String,
    commands: mpsc::Sender<MatchCommand>,
    snapshots: watch::Receiver<MatchSnapshot>,
    outcome: watch::Receiver<Option<MatchSummary>>,
    shutdown: Mutex<Option<oneshot::Sender<()>>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl LiveMatch {
    /// Kick off a match. Refused unless the referee is signed in.
    pub async fn start(
        config: SessionConfig,
        info: MatchInfo,
        auth: &Authorization,
        deps: MatchDeps,
    ) -> Result<Self> {
        let user_id = auth
            .user()
            .ok_or_else(|| anyhow!("Match {} refused: not signed in", info.match_id))?
            .to_string();
        info.validate()?;

        let session_id = format!("session-{}", uuid::Uuid::new_v4());
        info!(
            "Starting match {} ({} vs {}) as {} [{}]",
            info.match_id, info.home_team, info.away_team, user_id, session_id
        );

        let mut tracker = DistanceTracker::new(&config.location);
        let mut machine = PhaseMachine::new(info.clone(), Arc::clone(&config.timing), tracker.subscribe());
        let snapshots = machine.subscribe();

        if deps.audio.is_none() {
            machine.add_notice(Notice::WhistleUnavailable);
        }

        let mut location = deps.location;
        let location_rx = match location.as_mut() {
            Some(source) => match source.start().await {
                Ok(rx) => {
                    info!("Location updates from {}", source.name());
                    Some(rx)
                }
                Err(e) => {
                    warn!("Location unavailable: {:#}", e);
                    None
                }
            },
            None => None,
        };
        if location_rx.is_none() {
            machine.add_notice(Notice::LocationUnavailable);
        }

        tracker.start();
        let kickoff = machine.start();

        let (command_tx, command_rx) = mpsc::channel(32);
        let (whistle_tx, whistle_rx) = mpsc::channel(16);
        let (outcome_tx, outcome_rx) = watch::channel(None);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let runner = MatchRunner {
            machine,
            tracker,
            detector: WhistleDetector::new(config.whistle_threshold, deps.audio),
            whistle_tx,
            whistle_rx,
            location,
            location_rx,
            commands: command_rx,
            shutdown: shutdown_rx,
            fitness: deps.fitness,
            link: deps.link,
            outcome_tx,
        };
        let task = tokio::spawn(runner.run(kickoff));

        Ok(Self {
            session_id,
            info,
            user_id,
            commands: command_tx,
            snapshots,
            outcome: outcome_rx,
            shutdown: Mutex::new(Some(shutdown_tx)),
            task: Mutex::new(Some(task)),
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn info(&self) -> &MatchInfo {
        &self.info
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub async fn send(&self, command: MatchCommand) -> Result<()> {
        self.commands
            .send(command)
            .await
            .context("Match session is no longer running")
    }

    pub fn snapshot(&self) -> MatchSnapshot {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<MatchSnapshot> {
        self.snapshots.clone()
    }

    /// The final record, once the match has ended.
    pub fn summary(&self) -> Option<MatchSummary> {
        self.outcome.borrow().clone()
    }

    /// Wait for full time. `None` if the match was dismissed instead.
    pub async fn wait_for_summary(&self) -> Option<MatchSummary> {
        let mut outcome = self.outcome.clone();
        loop {
            if let Some(summary) = outcome.borrow_and_update().clone() {
                return Some(summary);
            }
            if outcome.changed().await.is_err() {
                return outcome.borrow().clone();
            }
        }
    }

    /// Leave the match screen: stop sensors and the loop, without a result.
    pub async fn dismiss(&self) {
        if let Some(shutdown) = self.shutdown.lock().await.take() {
            let _ = shutdown.send(());
        }

        let mut handle = self.task.lock().await;
        if let Some(task) = handle.take() {
            if let Err(e) = task.await {
                error!("Match task panicked: {}", e);
            }
        }
    }
}

struct MatchRunner {
    machine: PhaseMachine,
    tracker: DistanceTracker,
    detector: WhistleDetector,
    whistle_tx: mpsc::Sender<WhistleEvent>,
    whistle_rx: mpsc::Receiver<WhistleEvent>,
    location: Option<Box<dyn LocationSource>>,
    location_rx: Option<mpsc::Receiver<LocationSample>>,
    commands: mpsc::Receiver<MatchCommand>,
    shutdown: oneshot::Receiver<()>,
    fitness: Arc<dyn FitnessStore>,
    link: Option<Arc<dyn PhoneLink>>,
    outcome_tx: watch::Sender<Option<MatchSummary>>,
}

impl MatchRunner {
    async fn run(mut self, kickoff: Option<PhaseTransition>) {
        let info = self.machine.info().clone();
        self.notify(WatchMessage::MatchStarted {
            match_id: info.match_id.clone(),
            home_team: info.home_team.clone(),
            away_team: info.away_team.clone(),
        })
        .await;
        self.handle_transition(kickoff).await;

        let period = Duration::from_secs(1);
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let transition = self.machine.on_tick();
                    self.handle_transition(transition).await;
                }
                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command).await,
                    None => {
                        info!("Match {} dismissed", info.match_id);
                        break;
                    }
                },
                Some(event) = self.whistle_rx.recv() => {
                    // Events may still be queued after the detector stopped
                    if !self.detector.is_active() {
                        debug!("Ignoring whistle at {}ms from stopped detector", event.timestamp_ms);
                        continue;
                    }
                    let transition = self.machine.on_whistle();
                    self.handle_transition(transition).await;
                }
                sample = next_sample(&mut self.location_rx) => match sample {
                    Some(sample) => {
                        if let SampleOutcome::TooFast { speed_mps } = self.tracker.process(&sample) {
                            debug!("GPS jump rejected ({:.1}m/s)", speed_mps);
                        }
                    }
                    None => {
                        info!("Location stream ended");
                        self.location_rx = None;
                    }
                },
                _ = &mut self.shutdown => {
                    info!("Match {} dismissed", info.match_id);
                    break;
                }
            }

            if self.machine.phase() == MatchPhase::Ended {
                break;
            }
        }

        self.finish().await;
    }

    async fn handle_command(&mut self, command: MatchCommand) {
        let goals_before = self.machine.tally().goals;
        let transition = self.machine.apply(command);

        let goals = self.machine.tally().goals;
        if goals != goals_before {
            self.notify(WatchMessage::ScoreChanged {
                match_id: self.machine.info().match_id.clone(),
                home_score: goals.home,
                away_score: goals.away,
            })
            .await;
        }

        self.handle_transition(transition).await;
    }

    async fn handle_transition(&mut self, transition: Option<PhaseTransition>) {
        let Some(transition) = transition else {
            return;
        };

        match transition.to {
            MatchPhase::HalfTimePause => {
                if !self.detector.start(self.whistle_tx.clone()).await {
                    self.machine.add_notice(Notice::WhistleUnavailable);
                }
            }
            MatchPhase::SecondHalf | MatchPhase::Ended => self.detector.stop().await,
            _ => {}
        }

        self.notify(WatchMessage::PhaseChanged {
            match_id: self.machine.info().match_id.clone(),
            phase: transition.to,
            elapsed_secs: self.machine.elapsed_seconds(),
        })
        .await;
    }

    async fn finish(mut self) {
        self.detector.stop().await;

        if let Some(source) = self.location.as_mut() {
            if let Err(e) = source.stop().await {
                warn!("Failed to stop {}: {}", source.name(), e);
            }
        }

        if let Some(record) = self.tracker.stop() {
            if let Err(e) = self.fitness.save_workout(&record).await {
                error!("Failed to hand workout to {}: {:#}", self.fitness.name(), e);
            }
        }

        if let Some(summary) = self.machine.summary().cloned() {
            self.notify(WatchMessage::MatchFinished {
                summary: summary.clone(),
            })
            .await;
            self.outcome_tx.send_replace(Some(summary));
        }
    }

    async fn notify(&mut self, message: WatchMessage) {
        if let Some(link) = &self.link {
            if let Err(e) = link.send(&message).await {
                warn!("Phone link: {:#}", e);
            }
        }
    }
}

async fn next_sample(rx: &mut Option<mpsc::Receiver<LocationSample>>) -> Option<LocationSample> {
    match rx {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
