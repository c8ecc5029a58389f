use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub timing: MatchTimerSettings,
    pub whistle: WhistleConfig,
    pub location: LocationConfig,
    pub submission: SubmissionConfig,
    pub link: LinkConfig,
    pub http: HttpConfig,
    pub fitness_log: Option<String>,
}

/// What happens when the half-time countdown runs out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PauseExpiryPolicy {
    /// Show "ready for second half" and wait for a whistle or a tap.
    WaitForTrigger,
    /// Start the second half as soon as the countdown hits zero.
    AutoContinue,
}

/// Match timing, fixed for the lifetime of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MatchTimerSettings {
    pub first_half_secs: u64,
    pub second_half_secs: u64,
    pub half_time_pause_secs: u64,
    pub pause_expiry: PauseExpiryPolicy,
}

impl MatchTimerSettings {
    /// 10 second halves and pause, for trying things out on a wrist.
    pub fn quick() -> Self {
        Self {
            first_half_secs: 10,
            second_half_secs: 10,
            half_time_pause_secs: 10,
            pause_expiry: PauseExpiryPolicy::WaitForTrigger,
        }
    }

    /// Main clock value at which the second half runs into added time.
    pub fn full_time_secs(&self) -> u64 {
        self.first_half_secs + self.second_half_secs
    }
}

impl Default for MatchTimerSettings {
    fn default() -> Self {
        Self {
            first_half_secs: 45 * 60,
            second_half_secs: 45 * 60,
            half_time_pause_secs: 15 * 60,
            pause_expiry: PauseExpiryPolicy::WaitForTrigger,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AudioInputConfig {
    Microphone,
    File { path: String },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WhistleConfig {
    pub detection_threshold: f32,
    pub input: AudioInputConfig,
    /// Samples per analysed buffer
    pub buffer_size: usize,
    pub sample_rate: u32,
}

impl Default for WhistleConfig {
    fn default() -> Self {
        Self {
            detection_threshold: 0.6,
            input: AudioInputConfig::Microphone,
            buffer_size: 1024,
            sample_rate: 16000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LocationConfig {
    pub accuracy_threshold_m: f64,
    pub speed_ceiling_mps: f64,
    /// Recorded track to replay instead of a live receiver
    pub track_file: Option<String>,
}

impl Default for LocationConfig {
    fn default() -> Self {
        Self {
            accuracy_threshold_m: 20.0,
            speed_ceiling_mps: 10.0,
            track_file: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SubmissionConfig {
    pub endpoint: String,
    pub timeout_secs: u64,
    pub max_attempts: u32,
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://reftrack.cz/admin/api/match_result-api.php".to_string(),
            timeout_secs: 30,
            max_attempts: 3,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    pub nats_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 8787,
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("REFTRACK").separator("__"))
            .build()
            .with_context(|| format!("Failed to read config {}", path))?;

        Ok(settings.try_deserialize()?)
    }

    /// Where workout records are appended, with `~` expanded.
    pub fn fitness_log_path(&self) -> Option<PathBuf> {
        self.fitness_log
            .as_deref()
            .map(|p| PathBuf::from(shellexpand::tilde(p).into_owned()))
    }
}
