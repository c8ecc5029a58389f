// Integration tests for whistle detection
//
// A scripted audio backend stands in for the microphone so that start,
// stop and failure handling can be checked without real input.

use anyhow::{bail, Result};
use reftrack::audio::{detect, peak_amplitude, AudioBackend, AudioBuffer, WhistleDetector};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

fn buffer(level: f32, timestamp_ms: u64) -> AudioBuffer {
    AudioBuffer {
        samples: vec![0.0, level * 0.5, -level, level * 0.25],
        sample_rate: 16000,
        timestamp_ms,
    }
}

#[derive(Default)]
struct Counters {
    starts: AtomicUsize,
    stops: AtomicUsize,
}

/// Hands out a fixed list of buffers and keeps the stream open until stopped,
/// unless `close_after` is set
struct ScriptedBackend {
    buffers: Vec<AudioBuffer>,
    fail: bool,
    close_after: bool,
    counters: Arc<Counters>,
    tx: Option<mpsc::Sender<AudioBuffer>>,
}

impl ScriptedBackend {
    fn new(buffers: Vec<AudioBuffer>) -> (Self, Arc<Counters>) {
        let counters = Arc::new(Counters::default());
        let backend = Self {
            buffers,
            fail: false,
            close_after: false,
            counters: Arc::clone(&counters),
            tx: None,
        };
        (backend, counters)
    }

    fn failing() -> (Self, Arc<Counters>) {
        let (mut backend, counters) = Self::new(Vec::new());
        backend.fail = true;
        (backend, counters)
    }
}

#[async_trait::async_trait]
impl AudioBackend for ScriptedBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioBuffer>> {
        if self.fail {
            bail!("Microphone permission denied");
        }
        self.counters.starts.fetch_add(1, Ordering::SeqCst);

        let (tx, rx) = mpsc::channel(self.buffers.len().max(1));
        for buffer in &self.buffers {
            tx.send(buffer.clone()).await?;
        }
        if !self.close_after {
            self.tx = Some(tx);
        }
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        self.tx = None;
        self.counters.stops.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.tx.is_some()
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

#[test]
fn test_peak_amplitude() {
    assert_eq!(peak_amplitude(&[]), 0.0);
    assert_eq!(peak_amplitude(&[0.1, -0.7, 0.3]), 0.7);
}

#[test]
fn test_detect_uses_strict_threshold() {
    let quiet = buffer(0.6, 0);
    let loud = buffer(0.61, 64);

    assert!(detect(&quiet, 0.6).is_none(), "Peak equal to threshold is not a whistle");

    let event = detect(&loud, 0.6).expect("whistle");
    assert_eq!(event.timestamp_ms, 64);
    assert!((event.peak_amplitude - 0.61).abs() < 1e-6);
}

#[tokio::test]
async fn test_detector_reports_loud_buffers() -> Result<()> {
    let (backend, counters) = ScriptedBackend::new(vec![
        buffer(0.1, 0),
        buffer(0.9, 64),
        buffer(0.2, 128),
        buffer(0.8, 192),
    ]);
    let mut detector = WhistleDetector::new(0.6, Some(Box::new(backend)));
    let (events_tx, mut events_rx) = mpsc::channel(8);

    assert!(detector.start(events_tx).await);
    assert!(detector.is_active());
    assert_eq!(counters.starts.load(Ordering::SeqCst), 1);

    let first = timeout(Duration::from_secs(1), events_rx.recv()).await?;
    let second = timeout(Duration::from_secs(1), events_rx.recv()).await?;
    assert_eq!(first.map(|e| e.timestamp_ms), Some(64));
    assert_eq!(second.map(|e| e.timestamp_ms), Some(192));

    detector.stop().await;
    assert!(!detector.is_active());
    assert_eq!(counters.stops.load(Ordering::SeqCst), 1, "Audio input released");

    Ok(())
}

#[tokio::test]
async fn test_detector_can_restart_after_stop() -> Result<()> {
    let (backend, counters) = ScriptedBackend::new(vec![buffer(0.9, 0)]);
    let mut detector = WhistleDetector::new(0.6, Some(Box::new(backend)));
    let (events_tx, mut events_rx) = mpsc::channel(8);

    assert!(detector.start(events_tx.clone()).await);
    timeout(Duration::from_secs(1), events_rx.recv()).await?;
    detector.stop().await;

    assert!(detector.start(events_tx).await);
    let event = timeout(Duration::from_secs(1), events_rx.recv()).await?;
    assert!(event.is_some());
    assert_eq!(counters.starts.load(Ordering::SeqCst), 2);

    detector.stop().await;
    Ok(())
}

#[tokio::test]
async fn test_stop_without_start_is_harmless() {
    let (backend, counters) = ScriptedBackend::new(Vec::new());
    let mut detector = WhistleDetector::new(0.6, Some(Box::new(backend)));

    detector.stop().await;
    detector.stop().await;
    assert!(!detector.is_active());
    assert_eq!(counters.stops.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_failed_start_leaves_detector_inactive() {
    let (backend, _counters) = ScriptedBackend::failing();
    let mut detector = WhistleDetector::new(0.6, Some(Box::new(backend)));
    let (events_tx, _events_rx) = mpsc::channel(8);

    assert!(!detector.start(events_tx).await);
    assert!(!detector.is_active());
}

#[tokio::test]
async fn test_no_audio_input() {
    let mut detector = WhistleDetector::new(0.6, None);
    let (events_tx, _events_rx) = mpsc::channel(8);

    assert!(!detector.start(events_tx).await);
    assert!(!detector.is_active());
    assert_eq!(detector.threshold(), 0.6);
}

#[tokio::test]
async fn test_no_events_after_stop() -> Result<()> {
    let (backend, _counters) = ScriptedBackend::new(Vec::new());
    let mut detector = WhistleDetector::new(0.6, Some(Box::new(backend)));
    let (events_tx, mut events_rx) = mpsc::channel(8);

    detector.start(events_tx).await;
    detector.stop().await;

    // The listener dropped its sender when it exited
    let next = timeout(Duration::from_secs(1), events_rx.recv()).await?;
    assert!(next.is_none());

    Ok(())
}

#[tokio::test]
async fn test_stream_end_keeps_detector_active() -> Result<()> {
    let (mut backend, counters) = ScriptedBackend::new(vec![buffer(0.95, 32)]);
    backend.close_after = true;
    let mut detector = WhistleDetector::new(0.6, Some(Box::new(backend)));
    let (events_tx, mut events_rx) = mpsc::channel(8);

    assert!(detector.start(events_tx.clone()).await);

    let event = timeout(Duration::from_secs(1), events_rx.recv()).await?;
    assert_eq!(event.map(|e| e.timestamp_ms), Some(32));

    // Let the listener see the closed stream and release the input
    while counters.stops.load(Ordering::SeqCst) == 0 {
        tokio::task::yield_now().await;
    }
    assert!(detector.is_active(), "Only stop() deactivates the detector");

    // Starting again reclaims the finished listener
    assert!(detector.start(events_tx).await);
    let event = timeout(Duration::from_secs(1), events_rx.recv()).await?;
    assert!(event.is_some());
    assert_eq!(counters.starts.load(Ordering::SeqCst), 2);

    detector.stop().await;
    assert!(!detector.is_active());
    Ok(())
}
