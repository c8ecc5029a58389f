use tracing::info;

use super::clock::ElapsedClock;
use super::format::mm_ss;

/// Added-time clock
///
/// Runs only while the main clock is stopped. Its count is thrown away on
/// `stop()`; whoever needs the figure reads it before stopping.
#[derive(Debug, Clone, Default)]
pub struct OvertimeClock {
    overtime_secs: u64,
    running: bool,
}

impl OvertimeClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop `main` and start counting added time from zero.
    ///
    /// Returns false (and leaves both clocks alone) if already running.
    pub fn start(&mut self, main: &mut ElapsedClock) -> bool {
        if self.running {
            return false;
        }

        main.stop();
        self.overtime_secs = 0;
        self.running = true;
        info!("Added time started at {}", main.formatted_time());
        true
    }

    /// Stop and reset to zero, whether or not it was running.
    pub fn stop(&mut self) {
        if self.running {
            info!("Added time stopped at +{}", mm_ss(self.overtime_secs));
        }
        self.running = false;
        self.overtime_secs = 0;
    }

    /// Returns the new count, or `None` when not running.
    pub fn tick(&mut self) -> Option<u64> {
        if !self.running {
            return None;
        }
        self.overtime_secs += 1;
        Some(self.overtime_secs)
    }

    pub fn overtime_seconds(&self) -> u64 {
        self.overtime_secs
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn formatted_time(&self) -> String {
        mm_ss(self.overtime_secs)
    }
}
