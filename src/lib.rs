pub mod audio;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod session;
pub mod transport;

pub use audio::{
    AudioChunk, AudioFrame, CaptureBackend, CaptureBackendFactory, CaptureConfig, CaptureSource,
    ChunkScheduler,
};
pub use config::Config;
pub use dashboard::{
    Keyword, MeetingExport, MeetingState, MeetingStats, MessageRouter, Question, RouterStreams,
    SummaryUpdate, TranscriptLine,
};
pub use error::{DecodeError, SessionError};
pub use session::{RecordingController, Session, SessionClock, SessionConfig, SessionState};
pub use transport::{ControlMessage, InboundFrame, KeywordEntry, ResultMessage, StreamTransport};
