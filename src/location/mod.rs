//! Distance covered by the referee
//!
//! Location fixes come in from a [`LocationSource`]; the [`DistanceTracker`]
//! filters them and keeps the running total; a [`WorkoutRecord`] goes to the
//! [`FitnessStore`] when tracking stops.

pub mod geo;
pub mod sample;
pub mod source;
pub mod tracker;
pub mod workout;

pub use geo::{distance_between, haversine_m};
pub use sample::LocationSample;
pub use source::{LocationSource, TrackFileSource};
pub use tracker::{DistanceTracker, SampleOutcome};
pub use workout::{ActivityType, DiscardFitnessStore, FitnessStore, JsonLinesFitnessStore, WorkoutRecord};
