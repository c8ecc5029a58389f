use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One fix from the location receiver
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationSample {
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTime<Utc>,
    /// Radius of uncertainty in meters; negative means the fix is invalid
    pub horizontal_accuracy_m: f64,
}

impl LocationSample {
    /// Seconds from `earlier` to this sample (negative if out of order).
    pub fn seconds_since(&self, earlier: &LocationSample) -> f64 {
        (self.timestamp - earlier.timestamp).num_milliseconds() as f64 / 1000.0
    }
}
