use chrono::Local;
use serde::{Deserialize, Serialize};

use crate::transport::KeywordEntry;

/// Speaker label attached to transcript lines when the backend does not
/// attribute the text to anyone in particular.
pub const DEFAULT_SPEAKER: &str = "Speaker";

/// Marker the summarizer embeds when a summary update carries a topic.
pub const TOPIC_MARKER: &str = "- Topic:";

/// One rendered line in the transcript or translation panel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranscriptLine {
    /// Speaker label, when attribution is known
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub speaker: Option<String>,

    /// Line text
    pub text: String,

    /// Wall-clock arrival time, formatted for display
    pub time: String,
}

impl TranscriptLine {
    /// Line for the original-language transcript panel.
    pub fn spoken(text: impl Into<String>) -> Self {
        Self {
            speaker: Some(DEFAULT_SPEAKER.to_string()),
            text: text.into(),
            time: wall_clock_time(),
        }
    }

    /// Line for the translation panel. Translations arrive unattributed.
    pub fn translated(text: impl Into<String>) -> Self {
        Self {
            speaker: None,
            text: text.into(),
            time: wall_clock_time(),
        }
    }
}

fn wall_clock_time() -> String {
    Local::now().format("%H:%M:%S").to_string()
}

/// Result of splitting one raw summary update.
///
/// The summary text replaces the previous one; the topic, when present,
/// is appended to the running topic list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryUpdate {
    pub summary: String,
    pub topic: Option<String>,
}

impl SummaryUpdate {
    /// Split a raw summary on the topic marker.
    ///
    /// Text before the marker (trimmed) becomes the summary; text after
    /// it (trimmed) becomes the topic when non-empty. Without the marker
    /// the whole trimmed text is the summary and there is no topic.
    pub fn from_raw(raw: &str) -> Self {
        match raw.split_once(TOPIC_MARKER) {
            Some((summary, topic)) => {
                let topic = topic.trim();
                Self {
                    summary: summary.trim().to_string(),
                    topic: (!topic.is_empty()).then(|| topic.to_string()),
                }
            }
            None => Self {
                summary: raw.trim().to_string(),
                topic: None,
            },
        }
    }
}

/// A follow-up question suggested by the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Question {
    pub text: String,
}

/// A technical term with its short explanation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keyword {
    pub term: String,
    pub explanation: String,
}

impl From<KeywordEntry> for Keyword {
    fn from(entry: KeywordEntry) -> Self {
        Self {
            term: entry.keyword,
            explanation: entry.definition,
        }
    }
}
