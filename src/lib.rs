pub mod audio;
pub mod config;
pub mod http;
pub mod link;
pub mod location;
pub mod phase;
pub mod session;
pub mod submit;
pub mod timer;

pub use audio::{
    AudioBackend, AudioBackendConfig, AudioBackendFactory, AudioBuffer, AudioFile, AudioSource,
    WavFileBackend, WhistleDetector, WhistleEvent,
};
pub use config::{Config, MatchTimerSettings, PauseExpiryPolicy};
pub use http::{create_router, AppState};
pub use link::{NatsLink, PhoneLink, PhoneMessage, WatchMessage};
pub use location::{DistanceTracker, FitnessStore, LocationSample, LocationSource, WorkoutRecord};
pub use phase::{MatchCommand, MatchPhase, MatchSnapshot, MatchSummary, PhaseMachine};
pub use session::{Authorization, LiveMatch, MatchDeps, MatchInfo, SessionConfig};
pub use submit::{HttpSubmitter, ResultSubmitter, SubmissionOutbox};
