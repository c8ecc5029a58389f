use tracing::{debug, info};

use super::format::mm_ss;

/// Result of feeding one second to a clock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockTick {
    /// Clock is stopped, nothing changed
    Idle,
    /// Clock advanced to this many seconds
    Ticked(u64),
    /// Clock hit its boundary on this tick and stopped itself
    BoundaryReached(u64),
}

/// Main match clock
///
/// Counts whole seconds up to a boundary (the end of the current half on
/// the cumulative match clock) and then stops itself. It never decides what
/// happens next; the phase machine watches for `BoundaryReached`.
#[derive(Debug, Clone)]
pub struct ElapsedClock {
    elapsed_secs: u64,
    boundary_secs: u64,
    running: bool,
}

impl ElapsedClock {
    pub fn new(boundary_secs: u64) -> Self {
        Self {
            elapsed_secs: 0,
            boundary_secs,
            running: false,
        }
    }

    /// Start ticking. Returns false if the clock was already running.
    pub fn start(&mut self) -> bool {
        if self.running {
            return false;
        }

        info!(
            "Main clock started at {} (boundary {})",
            mm_ss(self.elapsed_secs),
            mm_ss(self.boundary_secs)
        );
        self.running = true;
        true
    }

    /// Stop ticking, keeping the elapsed value. Returns false if already stopped.
    pub fn stop(&mut self) -> bool {
        if !self.running {
            return false;
        }

        info!("Main clock stopped at {}", mm_ss(self.elapsed_secs));
        self.running = false;
        true
    }

    pub fn tick(&mut self) -> ClockTick {
        if !self.running {
            return ClockTick::Idle;
        }

        if self.elapsed_secs < self.boundary_secs {
            self.elapsed_secs += 1;
        }

        if self.elapsed_secs >= self.boundary_secs {
            self.running = false;
            debug!("Main clock reached boundary {}", mm_ss(self.boundary_secs));
            return ClockTick::BoundaryReached(self.elapsed_secs);
        }

        ClockTick::Ticked(self.elapsed_secs)
    }

    /// Direct override, used to seed the start of the second half.
    pub fn set_elapsed_seconds(&mut self, secs: u64) {
        debug!("Main clock set to {}", mm_ss(secs));
        self.elapsed_secs = secs;
    }

    pub fn set_boundary(&mut self, secs: u64) {
        self.boundary_secs = secs;
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed_secs
    }

    pub fn boundary_seconds(&self) -> u64 {
        self.boundary_secs
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn formatted_time(&self) -> String {
        mm_ss(self.elapsed_secs)
    }
}
