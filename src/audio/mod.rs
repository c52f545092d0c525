pub mod capture;
pub mod mic;
pub mod scheduler;
pub mod synthetic;

pub use capture::{
    AudioFrame, CaptureBackend, CaptureBackendFactory, CaptureConfig, CaptureSource,
};
pub use mic::MicrophoneBackend;
pub use scheduler::{AudioChunk, ChunkScheduler, CHUNK_ENCODING};
pub use synthetic::SyntheticBackend;
