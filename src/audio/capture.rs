use anyhow::Result;
use tokio::sync::mpsc;

/// Audio sample data (16-bit PCM, interleaved)
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

/// Configuration for a capture backend
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Target sample rate (backend converts if the device differs)
    pub sample_rate: u32,
    /// Target channel count (1 = mono, 2 = stereo)
    pub channels: u16,
    /// Frame size in milliseconds (affects latency)
    pub buffer_duration_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000, // What the processing backend expects
            channels: 1,        // Mono
            buffer_duration_ms: 100,
        }
    }
}

impl CaptureConfig {
    /// Number of interleaved samples in one frame at the target format.
    pub fn samples_per_frame(&self) -> usize {
        (self.sample_rate as u64 * self.buffer_duration_ms / 1000) as usize
            * self.channels as usize
    }
}

/// Audio capture backend trait
///
/// The recording controller treats capture as an injected collaborator:
/// it acquires the resource with `start` when a session begins and
/// releases it with `stop` when the session ends. Backends must support
/// repeated start/stop cycles on one value.
#[async_trait::async_trait]
pub trait CaptureBackend: Send + Sync {
    /// Acquire the capture resource and start producing frames.
    ///
    /// Returns a channel receiver that will receive audio frames until
    /// `stop` is called. Failure here is what the controller surfaces as
    /// `CaptureDenied`.
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>>;

    /// Release the capture resource. The frame channel closes.
    async fn stop(&mut self) -> Result<()>;

    /// Check if the backend is currently capturing
    fn is_capturing(&self) -> bool;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// Capture source type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureSource {
    /// Default input device via cpal
    Microphone,
    /// Built-in tone generator (no hardware; demos and tests)
    Synthetic,
}

/// Capture backend factory
pub struct CaptureBackendFactory;

impl CaptureBackendFactory {
    /// Create a capture backend for the given source.
    pub fn create(source: CaptureSource, config: CaptureConfig) -> Box<dyn CaptureBackend> {
        match source {
            CaptureSource::Microphone => Box::new(super::mic::MicrophoneBackend::new(config)),
            CaptureSource::Synthetic => Box::new(super::synthetic::SyntheticBackend::new(config)),
        }
    }
}
