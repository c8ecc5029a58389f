use tracing::info;

use super::format::mm_ss;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownTick {
    Idle,
    Remaining(u64),
    Expired,
}

/// Half-time pause countdown
#[derive(Debug, Clone)]
pub struct PauseCountdown {
    duration_secs: u64,
    remaining_secs: u64,
    running: bool,
}

impl PauseCountdown {
    pub fn new(duration_secs: u64) -> Self {
        Self {
            duration_secs,
            remaining_secs: duration_secs,
            running: false,
        }
    }

    /// Restart from the full pause duration.
    pub fn start(&mut self) {
        info!("Half-time pause started ({})", mm_ss(self.duration_secs));
        self.remaining_secs = self.duration_secs;
        self.running = true;
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn tick(&mut self) -> CountdownTick {
        if !self.running {
            return CountdownTick::Idle;
        }

        self.remaining_secs = self.remaining_secs.saturating_sub(1);

        if self.remaining_secs == 0 {
            self.running = false;
            info!("Half-time pause expired");
            return CountdownTick::Expired;
        }

        CountdownTick::Remaining(self.remaining_secs)
    }

    pub fn remaining_seconds(&self) -> u64 {
        self.remaining_secs
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn formatted_time(&self) -> String {
        mm_ss(self.remaining_secs)
    }
}
