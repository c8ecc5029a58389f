// Microphone capture through cpal
//
// cpal streams cannot cross threads, so each capture runs on its own thread
// that owns the device and the stream until told to stop.

use anyhow::{anyhow, bail, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, SizedSample, Stream, StreamConfig};
use std::sync::mpsc as std_mpsc;
use std::thread::JoinHandle;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, warn};

use super::backend::{AudioBackend, AudioBackendConfig, AudioBuffer};
use super::file::downmix;

/// Cuts interleaved device callbacks into mono buffers of a fixed size
pub struct BufferAssembler {
    channels: u16,
    sample_rate: u32,
    buffer_size: usize,
    pending: Vec<f32>,
    samples_emitted: u64,
}

impl BufferAssembler {
    pub fn new(channels: u16, sample_rate: u32, buffer_size: usize) -> Self {
        Self {
            channels,
            sample_rate,
            buffer_size: buffer_size.max(1),
            pending: Vec::new(),
            samples_emitted: 0,
        }
    }

    /// Add interleaved samples and return every buffer that filled up.
    pub fn push(&mut self, interleaved: &[f32]) -> Vec<AudioBuffer> {
        self.pending.extend(downmix(interleaved, self.channels));

        let mut ready = Vec::new();
        while self.pending.len() >= self.buffer_size {
            let samples: Vec<f32> = self.pending.drain(..self.buffer_size).collect();
            let timestamp_ms = if self.sample_rate == 0 {
                0
            } else {
                self.samples_emitted * 1000 / self.sample_rate as u64
            };
            self.samples_emitted += samples.len() as u64;
            ready.push(AudioBuffer {
                samples,
                sample_rate: self.sample_rate,
                timestamp_ms,
            });
        }
        ready
    }
}

struct Capture {
    stop_tx: std_mpsc::Sender<()>,
    thread: JoinHandle<()>,
}

/// Live input from the default microphone
///
/// The device is only opened on `start`, so creating the backend never
/// fails. `stop` drops the stream and releases the device.
pub struct MicrophoneBackend {
    config: AudioBackendConfig,
    capture: Option<Capture>,
}

impl MicrophoneBackend {
    pub fn new(config: AudioBackendConfig) -> Self {
        Self {
            config,
            capture: None,
        }
    }
}

#[async_trait::async_trait]
impl AudioBackend for MicrophoneBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioBuffer>> {
        if self.capture.is_some() {
            self.stop().await?;
        }

        let (tx, rx) = mpsc::channel(32);
        let (ready_tx, ready_rx) = oneshot::channel::<Result<String>>();
        let (stop_tx, stop_rx) = std_mpsc::channel::<()>();
        let buffer_size = self.config.buffer_size;

        let thread = std::thread::Builder::new()
            .name("reftrack-microphone".to_string())
            .spawn(move || {
                let stream = match open_input(buffer_size, tx) {
                    Ok((stream, device)) => {
                        let _ = ready_tx.send(Ok(device));
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };

                // Hold the stream until stop() or the backend is dropped
                let _ = stop_rx.recv();
                drop(stream);
            })
            .context("Failed to spawn capture thread")?;

        let device = match ready_rx.await {
            Ok(Ok(device)) => device,
            Ok(Err(e)) => {
                join_capture(thread).await;
                return Err(e);
            }
            Err(_) => {
                join_capture(thread).await;
                return Err(anyhow!("Capture thread exited before the input opened"));
            }
        };

        info!("Capturing from {}", device);

        self.capture = Some(Capture { stop_tx, thread });
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        let Some(capture) = self.capture.take() else {
            return Ok(());
        };

        let _ = capture.stop_tx.send(());
        join_capture(capture.thread).await;
        info!("Microphone released");
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capture.as_ref().is_some_and(|c| !c.thread.is_finished())
    }

    fn name(&self) -> &str {
        "microphone"
    }
}

async fn join_capture(thread: JoinHandle<()>) {
    match tokio::task::spawn_blocking(move || thread.join()).await {
        Ok(Ok(())) => {}
        Ok(Err(_)) => error!("Capture thread panicked"),
        Err(e) => error!("Failed to join capture thread: {}", e),
    }
}

fn open_input(buffer_size: usize, tx: mpsc::Sender<AudioBuffer>) -> Result<(Stream, String)> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .context("No input device available")?;
    let name = device.name().unwrap_or_else(|_| "default input".to_string());

    let supported = device
        .default_input_config()
        .context("Failed to get input config")?;
    let sample_format = supported.sample_format();
    let config: StreamConfig = supported.into();
    let assembler = BufferAssembler::new(config.channels, config.sample_rate.0, buffer_size);

    let stream = match sample_format {
        SampleFormat::F32 => build_stream::<f32>(&device, &config, assembler, tx, |s| s)?,
        SampleFormat::I16 => {
            build_stream::<i16>(&device, &config, assembler, tx, |s| s as f32 / 32768.0)?
        }
        SampleFormat::U16 => build_stream::<u16>(&device, &config, assembler, tx, |s| {
            (s as f32 - 32768.0) / 32768.0
        })?,
        other => bail!("Unsupported input sample format: {:?}", other),
    };

    stream.play().context("Failed to start input stream")?;
    info!(
        "Opened {} ({}Hz, {} channels)",
        name, config.sample_rate.0, config.channels
    );
    Ok((stream, name))
}

fn build_stream<T: SizedSample + 'static>(
    device: &Device,
    config: &StreamConfig,
    mut assembler: BufferAssembler,
    tx: mpsc::Sender<AudioBuffer>,
    to_f32: fn(T) -> f32,
) -> Result<Stream> {
    let stream = device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                let samples: Vec<f32> = data.iter().map(|&s| to_f32(s)).collect();
                for buffer in assembler.push(&samples) {
                    // Never block the audio thread
                    if let Err(mpsc::error::TrySendError::Full(_)) = tx.try_send(buffer) {
                        warn!("Whistle detector lagging, dropped an audio buffer");
                    }
                }
            },
            |err| error!("Input stream error: {}", err),
            None,
        )
        .context("Failed to build input stream")?;
    Ok(stream)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assembler_downmixes_and_cuts_buffers() {
        let mut assembler = BufferAssembler::new(2, 1000, 3);

        // Four stereo frames: one short of two mono buffers
        let ready = assembler.push(&[0.2, 0.4, -1.0, 0.0, 0.5, 0.5, 0.9, 0.9]);
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].samples.len(), 3);
        assert!((ready[0].samples[0] - 0.3).abs() < 1e-6);
        assert!((ready[0].samples[1] + 0.5).abs() < 1e-6);
        assert_eq!(ready[0].timestamp_ms, 0);

        let ready = assembler.push(&[0.0, 0.0, 0.1, 0.1]);
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].samples, vec![0.9, 0.0, 0.1]);
        assert_eq!(ready[0].timestamp_ms, 3);
        assert_eq!(ready[0].sample_rate, 1000);
    }

    #[test]
    fn test_assembler_mono_passthrough() {
        let mut assembler = BufferAssembler::new(1, 16000, 4);

        assert!(assembler.push(&[0.1, 0.2]).is_empty());
        let ready = assembler.push(&[0.3, 0.95, 0.0]);
        assert_eq!(ready.len(), 1);
        assert_eq!(ready[0].samples, vec![0.1, 0.2, 0.3, 0.95]);
    }

    #[tokio::test]
    async fn test_stop_before_start_is_harmless() {
        let mut backend = MicrophoneBackend::new(AudioBackendConfig::default());
        assert!(backend.stop().await.is_ok());
        assert!(!backend.is_capturing());
        assert_eq!(backend.name(), "microphone");
    }
}
