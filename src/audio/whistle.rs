//! Whistle detection
//!
//! A peak-amplitude threshold on each captured buffer. Every buffer whose
//! peak exceeds the threshold raises one event; there is no debouncing, so
//! consumers must tolerate repeats.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::backend::{AudioBackend, AudioBuffer};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WhistleEvent {
    pub peak_amplitude: f32,
    pub timestamp_ms: u64,
}

/// Largest absolute sample value, 0.0 for an empty buffer.
pub fn peak_amplitude(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0f32, |peak, s| peak.max(s.abs()))
}

/// Threshold check for a single buffer.
pub fn detect(buffer: &AudioBuffer, threshold: f32) -> Option<WhistleEvent> {
    let peak = peak_amplitude(&buffer.samples);
    (peak > threshold).then_some(WhistleEvent {
        peak_amplitude: peak,
        timestamp_ms: buffer.timestamp_ms,
    })
}

struct Listener {
    stop_tx: oneshot::Sender<()>,
    handle: JoinHandle<Box<dyn AudioBackend>>,
}

/// Listens to an audio backend and reports whistles
///
/// The backend is acquired on `start` and released on `stop`, or when the
/// buffer stream ends. If the backend cannot be started the detector stays
/// inactive and the caller falls back to manual control.
///
/// `is_active` only turns false through `stop`. A stream that runs dry
/// leaves the detector active, so events already queued still count.
pub struct WhistleDetector {
    threshold: f32,
    backend: Option<Box<dyn AudioBackend>>,
    listener: Option<Listener>,
    active: Arc<AtomicBool>,
}

impl WhistleDetector {
    pub fn new(threshold: f32, backend: Option<Box<dyn AudioBackend>>) -> Self {
        Self {
            threshold,
            backend,
            listener: None,
            active: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Start listening; whistles are sent to `events`.
    ///
    /// Returns whether the detector is listening afterwards.
    pub async fn start(&mut self, events: mpsc::Sender<WhistleEvent>) -> bool {
        if let Some(listener) = &self.listener {
            if !listener.handle.is_finished() {
                return true;
            }
            // Stream ran dry; reclaim the backend before restarting
            self.stop().await;
        }

        let Some(mut backend) = self.backend.take() else {
            warn!("Whistle detection unavailable: no audio input");
            return false;
        };

        let mut audio_rx = match backend.start().await {
            Ok(rx) => rx,
            Err(e) => {
                warn!("Whistle detection unavailable: {:#}", e);
                if let Err(e) = backend.stop().await {
                    error!("Failed to release audio input: {}", e);
                }
                self.backend = Some(backend);
                return false;
            }
        };

        info!(
            "Whistle detector listening on {} (threshold {:.2})",
            backend.name(),
            self.threshold
        );

        self.active.store(true, Ordering::SeqCst);
        let active = Arc::clone(&self.active);
        let threshold = self.threshold;
        let (stop_tx, mut stop_rx) = oneshot::channel();

        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    buffer = audio_rx.recv() => {
                        let Some(buffer) = buffer else {
                            debug!("Audio stream ended");
                            break;
                        };

                        if !active.load(Ordering::SeqCst) {
                            break;
                        }

                        if let Some(event) = detect(&buffer, threshold) {
                            debug!(
                                "Whistle at {}ms (peak {:.2})",
                                event.timestamp_ms, event.peak_amplitude
                            );
                            if events.send(event).await.is_err() {
                                break;
                            }
                        }
                    }
                }
            }

            if let Err(e) = backend.stop().await {
                error!("Failed to release audio input: {}", e);
            }
            backend
        });

        self.listener = Some(Listener { stop_tx, handle });
        true
    }

    /// Stop listening and release the audio input.
    pub async fn stop(&mut self) {
        self.active.store(false, Ordering::SeqCst);

        let Some(listener) = self.listener.take() else {
            return;
        };

        let _ = listener.stop_tx.send(());
        match listener.handle.await {
            Ok(backend) => self.backend = Some(backend),
            Err(e) => error!("Whistle listener panicked: {}", e),
        }

        info!("Whistle detector stopped");
    }
}
