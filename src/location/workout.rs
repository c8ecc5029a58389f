use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    Running,
}

/// Workout handed to the fitness-data store when tracking stops
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkoutRecord {
    pub activity_type: ActivityType,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub total_distance_meters: f64,
}

/// Write-and-forget sink for finished workouts
#[async_trait::async_trait]
pub trait FitnessStore: Send + Sync {
    async fn save_workout(&self, record: &WorkoutRecord) -> Result<()>;

    fn name(&self) -> &str;
}

/// Appends one JSON object per line
pub struct JsonLinesFitnessStore {
    path: PathBuf,
}

impl JsonLinesFitnessStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait::async_trait]
impl FitnessStore for JsonLinesFitnessStore {
    async fn save_workout(&self, record: &WorkoutRecord) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .context("Failed to create fitness log directory")?;
        }

        let mut line = serde_json::to_vec(record)?;
        line.push(b'\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .with_context(|| format!("Failed to open {}", self.path.display()))?;
        file.write_all(&line)
            .await
            .context("Failed to append workout")?;
        file.flush().await?;

        info!(
            "Workout saved to {} ({:.0}m)",
            self.path.display(),
            record.total_distance_meters
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "json-lines"
    }
}

/// Used when no fitness store is configured
pub struct DiscardFitnessStore;

#[async_trait::async_trait]
impl FitnessStore for DiscardFitnessStore {
    async fn save_workout(&self, record: &WorkoutRecord) -> Result<()> {
        info!(
            "No fitness store configured, dropping workout ({:.0}m)",
            record.total_distance_meters
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "discard"
    }
}
