pub mod backend;
pub mod file;
pub mod microphone;
pub mod whistle;

pub use backend::{AudioBackend, AudioBackendConfig, AudioBackendFactory, AudioBuffer, AudioSource};
pub use file::{AudioFile, WavFileBackend};
pub use microphone::{BufferAssembler, MicrophoneBackend};
pub use whistle::{detect, peak_amplitude, WhistleDetector, WhistleEvent};
