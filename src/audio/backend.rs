use anyhow::Result;
use tokio::sync::mpsc;

use super::file::WavFileBackend;
use super::microphone::MicrophoneBackend;

/// One block of normalized mono samples (-1.0..=1.0)
#[derive(Debug, Clone)]
pub struct AudioBuffer {
    pub samples: Vec<f32>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

impl AudioBuffer {
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 {
            return 0;
        }
        self.samples.len() as u64 * 1000 / self.sample_rate as u64
    }
}

/// How buffers are cut and paced
#[derive(Debug, Clone)]
pub struct AudioBackendConfig {
    /// Samples per buffer handed to the detector
    pub buffer_size: usize,
    /// Expected input sample rate
    pub sample_rate: u32,
    /// Deliver buffers at the pace they were recorded (replay backends)
    pub realtime: bool,
}

impl Default for AudioBackendConfig {
    fn default() -> Self {
        Self {
            buffer_size: 1024,
            sample_rate: 16000,
            realtime: true,
        }
    }
}

/// Source of audio buffers for the whistle detector
///
/// A backend can be started and stopped repeatedly; each `start` hands out
/// a fresh buffer channel. `stop` must release the input even if the
/// consumer has already gone away.
#[async_trait::async_trait]
pub trait AudioBackend: Send + Sync {
    /// Acquire the input and start delivering buffers on the returned channel
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioBuffer>>;

    /// Release the input
    async fn stop(&mut self) -> Result<()>;

    fn is_capturing(&self) -> bool;

    fn name(&self) -> &str;
}

pub struct AudioBackendFactory;

impl AudioBackendFactory {
    /// Devices are opened on `start`, so a missing microphone shows up there
    pub fn create(source: AudioSource, config: AudioBackendConfig) -> Result<Box<dyn AudioBackend>> {
        match source {
            AudioSource::Microphone => Ok(Box::new(MicrophoneBackend::new(config))),

            AudioSource::File(path) => Ok(Box::new(WavFileBackend::new(path, config))),
        }
    }
}

/// Where whistle audio comes from
#[derive(Debug, Clone)]
pub enum AudioSource {
    /// Default input device
    Microphone,
    /// Recorded WAV file (replay, testing)
    File(String),
}
