pub mod router;
pub mod state;
pub mod types;

pub use router::{MessageRouter, RouterStreams};
pub use state::{ExportSession, MeetingExport, MeetingState, MeetingStats};
pub use types::{Keyword, Question, SummaryUpdate, TranscriptLine, DEFAULT_SPEAKER, TOPIC_MARKER};
