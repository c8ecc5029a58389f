// Integration tests for live match sessions
//
// These run a whole match on the paused tokio clock: the session's 1 Hz
// ticker fires as soon as every task is idle, so a 10 second half takes
// no real time.

use anyhow::Result;
use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use reftrack::audio::{AudioBackend, AudioBuffer};
use reftrack::config::MatchTimerSettings;
use reftrack::link::{PhoneLink, WatchMessage};
use reftrack::location::{FitnessStore, LocationSample, TrackFileSource, WorkoutRecord};
use reftrack::phase::{MatchCommand, MatchPhase, MatchSnapshot, Notice, TallyKind, Team};
use reftrack::session::{Authorization, LiveMatch, MatchDeps, MatchInfo, SessionConfig};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::{mpsc, watch};

fn quick_config() -> SessionConfig {
    SessionConfig {
        timing: Arc::new(MatchTimerSettings::quick()),
        ..SessionConfig::default()
    }
}

fn info() -> MatchInfo {
    MatchInfo::new("match-7", "Bohemians", "Zbrojovka")
}

fn referee() -> Authorization {
    Authorization::signed_in("ref-1")
}

async fn wait_for_phase(snapshots: &mut watch::Receiver<MatchSnapshot>, phase: MatchPhase) -> MatchSnapshot {
    snapshots
        .wait_for(|s| s.phase == phase)
        .await
        .expect("match loop ended early")
        .clone()
}

async fn end_period(live: &LiveMatch) -> Result<()> {
    live.send(MatchCommand::RequestEndPeriod).await?;
    live.send(MatchCommand::Confirm).await
}

#[derive(Default)]
struct RecordingLink {
    sent: Mutex<Vec<WatchMessage>>,
}

impl RecordingLink {
    fn messages(&self) -> Vec<WatchMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl PhoneLink for RecordingLink {
    async fn send(&self, message: &WatchMessage) -> Result<()> {
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

#[derive(Default)]
struct RecordingStore {
    saved: Mutex<Vec<WorkoutRecord>>,
}

#[async_trait::async_trait]
impl FitnessStore for RecordingStore {
    async fn save_workout(&self, record: &WorkoutRecord) -> Result<()> {
        self.saved.lock().unwrap().push(record.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "recording"
    }
}

/// Blows a whistle a fixed time after listening starts
struct DelayedWhistle {
    delay: Duration,
    task: Option<tokio::task::JoinHandle<()>>,
}

#[async_trait::async_trait]
impl AudioBackend for DelayedWhistle {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioBuffer>> {
        let (tx, rx) = mpsc::channel(4);
        let delay = self.delay;
        self.task = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx
                .send(AudioBuffer {
                    samples: vec![0.95; 256],
                    sample_rate: 16000,
                    timestamp_ms: delay.as_millis() as u64,
                })
                .await;
            // Keep the input open until stopped
            std::future::pending::<()>().await;
        }));
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.task.is_some()
    }

    fn name(&self) -> &str {
        "delayed whistle"
    }
}

/// Blows one whistle a fixed time after listening starts, then closes the stream
struct LastWhistle {
    delay: Duration,
    capturing: bool,
}

#[async_trait::async_trait]
impl AudioBackend for LastWhistle {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioBuffer>> {
        let (tx, rx) = mpsc::channel(4);
        let delay = self.delay;
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx
                .send(AudioBuffer {
                    samples: vec![0.95; 64],
                    sample_rate: 16000,
                    timestamp_ms: delay.as_millis() as u64,
                })
                .await;
        });
        self.capturing = true;
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        self.capturing = false;
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }

    fn name(&self) -> &str {
        "last whistle"
    }
}

#[tokio::test(start_paused = true)]
async fn test_match_refused_without_sign_in() {
    let result = LiveMatch::start(quick_config(), info(), &Authorization::default(), MatchDeps::default()).await;
    assert!(result.is_err());

    let logged_in_without_id = Authorization {
        is_logged_in: true,
        user_id: None,
    };
    let result = LiveMatch::start(quick_config(), info(), &logged_in_without_id, MatchDeps::default()).await;
    assert!(result.is_err());
}

#[tokio::test(start_paused = true)]
async fn test_match_refused_without_team_names() {
    let info = MatchInfo::new("match-8", "Bohemians", " ");
    let result = LiveMatch::start(quick_config(), info, &referee(), MatchDeps::default()).await;
    assert!(result.is_err());
}

#[tokio::test(start_paused = true)]
async fn test_full_match_with_tap_restart() -> Result<()> {
    let link = Arc::new(RecordingLink::default());
    let store = Arc::new(RecordingStore::default());
    let deps = MatchDeps {
        fitness: store.clone(),
        link: Some(link.clone()),
        ..MatchDeps::default()
    };

    let live = LiveMatch::start(quick_config(), info(), &referee(), deps).await?;
    assert!(live.session_id().starts_with("session-"));
    assert_eq!(live.user_id(), "ref-1");

    let mut snapshots = live.subscribe();
    let first = wait_for_phase(&mut snapshots, MatchPhase::FirstHalf).await;
    assert!(first.notices.contains(&Notice::WhistleUnavailable));
    assert!(first.notices.contains(&Notice::LocationUnavailable));

    live.send(MatchCommand::Increment {
        kind: TallyKind::Goal,
        team: Team::Away,
    })
    .await?;

    wait_for_phase(&mut snapshots, MatchPhase::FirstHalfOvertime).await;
    snapshots.wait_for(|s| s.overtime_secs >= 3).await?;
    end_period(&live).await?;

    let pause = wait_for_phase(&mut snapshots, MatchPhase::HalfTimePause).await;
    let reported = pause.first_half_reported_secs.expect("first half reported");
    assert!((13..=14).contains(&reported), "first half {}", reported);

    wait_for_phase(&mut snapshots, MatchPhase::HalfTimePauseEnding).await;
    live.send(MatchCommand::StartSecondHalf).await?;

    let second = wait_for_phase(&mut snapshots, MatchPhase::SecondHalf).await;
    assert_eq!(second.elapsed_secs, 10);

    wait_for_phase(&mut snapshots, MatchPhase::SecondHalfOvertime).await;
    end_period(&live).await?;

    let summary = live.wait_for_summary().await.expect("summary");
    assert_eq!(summary.match_id, "match-7");
    assert_eq!(summary.first_half_duration_secs, reported);
    assert!((10..=11).contains(&summary.second_half_duration_secs));
    assert_eq!(summary.home_score, 0);
    assert_eq!(summary.away_score, 1);
    assert_eq!(live.summary(), Some(summary.clone()));
    assert_eq!(live.snapshot().phase, MatchPhase::Ended);

    let saved = store.saved.lock().unwrap().clone();
    assert_eq!(saved.len(), 1, "Workout handed to the fitness store");

    let messages = link.messages();
    assert!(matches!(messages.first(), Some(WatchMessage::MatchStarted { .. })));
    assert!(messages.iter().any(|m| matches!(
        m,
        WatchMessage::ScoreChanged { away_score: 1, .. }
    )));
    assert!(messages.iter().any(|m| matches!(
        m,
        WatchMessage::PhaseChanged { phase: MatchPhase::HalfTimePause, .. }
    )));
    assert!(matches!(
        messages.last(),
        Some(WatchMessage::MatchFinished { summary: s }) if s.match_id == "match-7"
    ));

    // The loop is gone after full time
    assert!(live.send(MatchCommand::Confirm).await.is_err());

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_whistle_starts_second_half() -> Result<()> {
    let deps = MatchDeps {
        audio: Some(Box::new(DelayedWhistle {
            delay: Duration::from_secs(15),
            task: None,
        })),
        ..MatchDeps::default()
    };

    let live = LiveMatch::start(quick_config(), info(), &referee(), deps).await?;
    let mut snapshots = live.subscribe();
    assert!(!live.snapshot().notices.contains(&Notice::WhistleUnavailable));

    wait_for_phase(&mut snapshots, MatchPhase::FirstHalfOvertime).await;
    end_period(&live).await?;
    wait_for_phase(&mut snapshots, MatchPhase::HalfTimePauseEnding).await;

    // No tap: the whistle five seconds after the pause ran out restarts play
    let second = wait_for_phase(&mut snapshots, MatchPhase::SecondHalf).await;
    assert_eq!(second.elapsed_secs, 10);

    live.dismiss().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_whistle_counts_when_audio_stream_ends() -> Result<()> {
    let deps = MatchDeps {
        audio: Some(Box::new(LastWhistle {
            delay: Duration::from_secs(15),
            capturing: false,
        })),
        ..MatchDeps::default()
    };

    let live = LiveMatch::start(quick_config(), info(), &referee(), deps).await?;
    let mut snapshots = live.subscribe();

    wait_for_phase(&mut snapshots, MatchPhase::FirstHalfOvertime).await;
    end_period(&live).await?;
    wait_for_phase(&mut snapshots, MatchPhase::HalfTimePauseEnding).await;

    // The final buffer is loud and the input closes right after it
    let second = wait_for_phase(&mut snapshots, MatchPhase::SecondHalf).await;
    assert_eq!(second.elapsed_secs, 10);

    live.dismiss().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_distance_from_track_reaches_summary() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let path = temp_dir.path().join("track.json");

    let start = Utc.with_ymd_and_hms(2024, 9, 14, 15, 0, 0).unwrap();
    let meter_lat = 1.0 / 111_194.926_644_558_74;
    let track: Vec<LocationSample> = (0..3)
        .map(|i| LocationSample {
            latitude: 50.0 + 4.0 * i as f64 * meter_lat,
            longitude: 14.4,
            timestamp: start + ChronoDuration::seconds(2 * i),
            horizontal_accuracy_m: 5.0,
        })
        .collect();
    std::fs::write(&path, serde_json::to_vec(&track)?)?;

    let store = Arc::new(RecordingStore::default());
    let deps = MatchDeps {
        location: Some(Box::new(TrackFileSource::new(path.display().to_string(), false))),
        fitness: store.clone(),
        ..MatchDeps::default()
    };

    let live = LiveMatch::start(quick_config(), info(), &referee(), deps).await?;
    let mut snapshots = live.subscribe();
    snapshots.wait_for(|s| s.total_distance_meters > 7.9).await?;

    end_period(&live).await?;
    wait_for_phase(&mut snapshots, MatchPhase::HalfTimePauseEnding).await;
    live.send(MatchCommand::StartSecondHalf).await?;
    wait_for_phase(&mut snapshots, MatchPhase::SecondHalf).await;
    end_period(&live).await?;

    let summary = live.wait_for_summary().await.expect("summary");
    assert!((summary.total_distance_meters - 8.0).abs() < 0.05);
    assert_eq!(summary.distance_display(), "0.01 km");

    let saved = store.saved.lock().unwrap().clone();
    assert_eq!(saved.len(), 1);
    assert!((saved[0].total_distance_meters - 8.0).abs() < 0.05);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_dismiss_leaves_without_result() -> Result<()> {
    let store = Arc::new(RecordingStore::default());
    let deps = MatchDeps {
        fitness: store.clone(),
        ..MatchDeps::default()
    };

    let live = LiveMatch::start(quick_config(), info(), &referee(), deps).await?;
    let mut snapshots = live.subscribe();
    snapshots.wait_for(|s| s.elapsed_secs >= 3).await?;

    live.dismiss().await;

    assert_eq!(live.wait_for_summary().await, None);
    assert_eq!(live.summary(), None);
    assert!(live.send(MatchCommand::RequestEndPeriod).await.is_err());
    assert_eq!(store.saved.lock().unwrap().len(), 1, "Workout still recorded");

    // Dismissing twice is fine
    live.dismiss().await;
    Ok(())
}
