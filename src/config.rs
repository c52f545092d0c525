use std::time::Duration;

use anyhow::Result;
use serde::Deserialize;

use crate::audio::CaptureConfig;
use crate::session::SessionConfig;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub endpoint: EndpointConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub recording: RecordingConfig,
}

#[derive(Debug, Deserialize)]
pub struct EndpointConfig {
    /// WebSocket URL of the processing backend
    pub url: String,
}

#[derive(Debug, Deserialize)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub channels: u16,
    pub buffer_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct RecordingConfig {
    /// Default language for the session handshake
    pub language: String,
    /// Audio chunk cadence in milliseconds
    pub chunk_cadence_ms: u64,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost:8765".to_string(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            channels: 1,
            buffer_ms: 100,
        }
    }
}

impl Default for RecordingConfig {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            chunk_cadence_ms: 5000,
        }
    }
}

impl Config {
    /// Load configuration from a file; any section left out of the file
    /// falls back to its defaults.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Capture format derived from the audio section.
    pub fn capture_config(&self) -> CaptureConfig {
        CaptureConfig {
            sample_rate: self.audio.sample_rate,
            channels: self.audio.channels,
            buffer_duration_ms: self.audio.buffer_ms,
        }
    }

    /// Session parameters derived from the recording section.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            language: self.recording.language.clone(),
            chunk_cadence: Duration::from_millis(self.recording.chunk_cadence_ms),
        }
    }
}
