use anyhow::{Context, Result};
use hound::{SampleFormat, WavReader};
use std::path::Path;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::backend::{AudioBackend, AudioBackendConfig, AudioBuffer};

/// A WAV file decoded to normalized mono samples
pub struct AudioFile {
    pub path: String,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<f32>,
}

impl AudioFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening audio file: {}", path.display());

        let reader = WavReader::open(path).context("Failed to open WAV file")?;

        let spec = reader.spec();
        let interleaved: Vec<f32> = match spec.sample_format {
            SampleFormat::Float => reader
                .into_samples::<f32>()
                .collect::<Result<Vec<_>, _>>()
                .context("Failed to read audio samples")?,
            SampleFormat::Int => {
                let full_scale = (1i64 << (spec.bits_per_sample.max(1) - 1)) as f32;
                reader
                    .into_samples::<i32>()
                    .map(|s| s.map(|v| v as f32 / full_scale))
                    .collect::<Result<Vec<_>, _>>()
                    .context("Failed to read audio samples")?
            }
        };

        let samples = downmix(&interleaved, spec.channels);
        let duration_seconds = samples.len() as f64 / spec.sample_rate as f64;

        info!(
            "Audio file loaded: {:.1}s, {}Hz, {} channels, {} samples",
            duration_seconds,
            spec.sample_rate,
            spec.channels,
            samples.len()
        );

        Ok(Self {
            path: path.display().to_string(),
            duration_seconds,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            samples,
        })
    }

    /// Split into consecutive buffers of `buffer_size` samples (last one may be short).
    pub fn buffers(&self, buffer_size: usize) -> Vec<AudioBuffer> {
        let buffer_size = buffer_size.max(1);
        self.samples
            .chunks(buffer_size)
            .enumerate()
            .map(|(i, chunk)| AudioBuffer {
                samples: chunk.to_vec(),
                sample_rate: self.sample_rate,
                timestamp_ms: (i * buffer_size) as u64 * 1000 / self.sample_rate.max(1) as u64,
            })
            .collect()
    }
}

/// Average interleaved channels into one.
pub(crate) fn downmix(interleaved: &[f32], channels: u16) -> Vec<f32> {
    if channels <= 1 {
        return interleaved.to_vec();
    }

    interleaved
        .chunks_exact(channels as usize)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}

/// Replays a WAV file as if it were live input
pub struct WavFileBackend {
    path: String,
    config: AudioBackendConfig,
    task: Option<JoinHandle<()>>,
}

impl WavFileBackend {
    pub fn new(path: impl Into<String>, config: AudioBackendConfig) -> Self {
        Self {
            path: path.into(),
            config,
            task: None,
        }
    }
}

#[async_trait::async_trait]
impl AudioBackend for WavFileBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioBuffer>> {
        if self.task.is_some() {
            self.stop().await?;
        }

        let path = self.path.clone();
        let audio = tokio::task::spawn_blocking(move || AudioFile::open(path))
            .await
            .context("WAV loader panicked")??;

        if audio.sample_rate != self.config.sample_rate {
            warn!(
                "{} is {}Hz, expected {}Hz",
                audio.path, audio.sample_rate, self.config.sample_rate
            );
        }

        let buffers = audio.buffers(self.config.buffer_size);
        let realtime = self.config.realtime;
        let (tx, rx) = mpsc::channel(32);

        self.task = Some(tokio::spawn(async move {
            for buffer in buffers {
                let pace = Duration::from_millis(buffer.duration_ms());
                if tx.send(buffer).await.is_err() {
                    break;
                }
                if realtime {
                    tokio::time::sleep(pace).await;
                }
            }
        }));

        info!("Replaying {} ({:.1}s)", audio.path, audio.duration_seconds);

        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        if let Some(task) = self.task.take() {
            task.abort();
            info!("Stopped replaying {}", self.path);
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    fn name(&self) -> &str {
        "WAV file"
    }
}
