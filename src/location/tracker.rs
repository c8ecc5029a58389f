use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tracing::{debug, info};

use super::geo::distance_between;
use super::sample::LocationSample;
use super::workout::{ActivityType, WorkoutRecord};
use crate::config::LocationConfig;

/// What happened to one location sample
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SampleOutcome {
    /// Tracker is stopped
    Ignored,
    /// First usable fix; nothing to measure against yet
    Baseline,
    Accepted { delta_m: f64 },
    /// Accuracy worse than the threshold (or invalid)
    Inaccurate { accuracy_m: f64 },
    /// Not newer than the previous accepted fix
    OutOfOrder,
    /// Implied speed above the plausibility ceiling
    TooFast { speed_mps: f64 },
}

/// Accumulates the distance the referee covers
///
/// Only fixes at or better than the accuracy threshold count. A delta whose
/// implied speed exceeds the ceiling is dropped and the previous fix stays
/// the reference point. The running total is published after every accepted
/// sample.
pub struct DistanceTracker {
    accuracy_threshold_m: f64,
    speed_ceiling_mps: f64,
    last: Option<LocationSample>,
    total_m: f64,
    started_at: Option<DateTime<Utc>>,
    total_tx: watch::Sender<f64>,
}

impl DistanceTracker {
    pub fn new(config: &LocationConfig) -> Self {
        let (total_tx, _) = watch::channel(0.0);
        Self {
            accuracy_threshold_m: config.accuracy_threshold_m,
            speed_ceiling_mps: config.speed_ceiling_mps,
            last: None,
            total_m: 0.0,
            started_at: None,
            total_tx,
        }
    }

    /// Read-only view of the running total.
    pub fn subscribe(&self) -> watch::Receiver<f64> {
        self.total_tx.subscribe()
    }

    pub fn start(&mut self) {
        if self.started_at.is_some() {
            return;
        }

        info!(
            "Distance tracking started (accuracy <= {}m, speed <= {}m/s)",
            self.accuracy_threshold_m, self.speed_ceiling_mps
        );
        self.started_at = Some(Utc::now());
        self.last = None;
    }

    pub fn is_running(&self) -> bool {
        self.started_at.is_some()
    }

    pub fn process(&mut self, sample: &LocationSample) -> SampleOutcome {
        if !self.is_running() {
            return SampleOutcome::Ignored;
        }

        let accuracy_m = sample.horizontal_accuracy_m;
        if !(0.0..=self.accuracy_threshold_m).contains(&accuracy_m) {
            debug!("Dropping fix with accuracy {:.1}m", accuracy_m);
            return SampleOutcome::Inaccurate { accuracy_m };
        }

        let Some(previous) = self.last else {
            self.last = Some(*sample);
            return SampleOutcome::Baseline;
        };

        let elapsed_s = sample.seconds_since(&previous);
        if elapsed_s <= 0.0 {
            debug!("Dropping out-of-order fix ({:.3}s)", elapsed_s);
            return SampleOutcome::OutOfOrder;
        }

        let delta_m = distance_between(&previous, sample);
        let speed_mps = delta_m / elapsed_s;
        if speed_mps > self.speed_ceiling_mps {
            debug!(
                "Dropping GPS jump: {:.1}m in {:.1}s ({:.1}m/s)",
                delta_m, elapsed_s, speed_mps
            );
            return SampleOutcome::TooFast { speed_mps };
        }

        self.last = Some(*sample);
        self.total_m += delta_m;
        self.total_tx.send_replace(self.total_m);
        SampleOutcome::Accepted { delta_m }
    }

    pub fn total_distance_meters(&self) -> f64 {
        self.total_m
    }

    /// Stop tracking and produce the workout record for the fitness store.
    pub fn stop(&mut self) -> Option<WorkoutRecord> {
        let start = self.started_at.take()?;
        self.last = None;

        let record = WorkoutRecord {
            activity_type: ActivityType::Running,
            start,
            end: Utc::now(),
            total_distance_meters: self.total_m,
        };
        info!("Distance tracking stopped: {:.0}m", self.total_m);
        Some(record)
    }
}
