use anyhow::{Context, Result};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

use super::sample::LocationSample;

/// Stream of location fixes
#[async_trait::async_trait]
pub trait LocationSource: Send + Sync {
    /// Start delivering fixes
    async fn start(&mut self) -> Result<mpsc::Receiver<LocationSample>>;

    /// Stop delivering fixes
    async fn stop(&mut self) -> Result<()>;

    fn is_streaming(&self) -> bool;

    /// Get source name for logging
    fn name(&self) -> &str;
}

/// Replays a recorded track (a JSON array of samples)
pub struct TrackFileSource {
    path: String,
    realtime: bool,
    task: Option<JoinHandle<()>>,
}

impl TrackFileSource {
    pub fn new(path: impl Into<String>, realtime: bool) -> Self {
        Self {
            path: path.into(),
            realtime,
            task: None,
        }
    }

    pub async fn load(path: &str) -> Result<Vec<LocationSample>> {
        let raw = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read track {}", path))?;
        serde_json::from_slice(&raw).with_context(|| format!("Malformed track {}", path))
    }
}

#[async_trait::async_trait]
impl LocationSource for TrackFileSource {
    async fn start(&mut self) -> Result<mpsc::Receiver<LocationSample>> {
        self.stop().await?;

        let samples = Self::load(&self.path).await?;
        info!("Replaying {} location samples from {}", samples.len(), self.path);

        let realtime = self.realtime;
        let (tx, rx) = mpsc::channel(64);

        self.task = Some(tokio::spawn(async move {
            let mut previous: Option<LocationSample> = None;
            for sample in samples {
                if realtime {
                    if let Some(prev) = previous {
                        let gap = sample.seconds_since(&prev).max(0.0);
                        tokio::time::sleep(Duration::from_secs_f64(gap)).await;
                    }
                }
                previous = Some(sample);
                if tx.send(sample).await.is_err() {
                    break;
                }
            }
        }));

        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        Ok(())
    }

    fn is_streaming(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    fn name(&self) -> &str {
        "track file"
    }
}
