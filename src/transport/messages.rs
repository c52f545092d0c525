use serde::{Deserialize, Serialize};

use crate::error::DecodeError;

/// Outbound control frame, sent as JSON text.
///
/// One `Config` goes out per recording session, always before that
/// session's first audio chunk; the backend keys its pipeline (translation
/// target, summary language) off it for the rest of the session.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ControlMessage {
    Config { language: String },
}

/// One keyword/definition pair as the backend sends it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordEntry {
    pub keyword: String,
    pub definition: String,
}

/// Decoded inbound result, tagged by which dashboard panel it feeds.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultMessage {
    Transcript(String),
    Translated(String),
    Summary(String),
    Questions(Vec<String>),
    Keywords(Vec<KeywordEntry>),
}

/// Raw inbound shape: `{"type": <tag>, "data": <payload>}`.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    data: serde_json::Value,
}

fn payload<T: serde::de::DeserializeOwned>(
    kind: &str,
    data: serde_json::Value,
) -> Result<T, DecodeError> {
    serde_json::from_value(data).map_err(|source| DecodeError::BadPayload {
        kind: kind.to_string(),
        source,
    })
}

impl ResultMessage {
    /// Decode a raw frame received over the transport.
    ///
    /// The tag is matched by hand rather than through a serde enum so an
    /// unrecognized `type` is reported distinctly from malformed JSON.
    pub fn decode(frame: &[u8]) -> Result<Self, DecodeError> {
        let envelope: Envelope = serde_json::from_slice(frame)?;

        match envelope.kind.as_str() {
            "transcript" => Ok(Self::Transcript(payload("transcript", envelope.data)?)),
            "translated" => Ok(Self::Translated(payload("translated", envelope.data)?)),
            "summary" => Ok(Self::Summary(payload("summary", envelope.data)?)),
            "questions" => Ok(Self::Questions(payload("questions", envelope.data)?)),
            "keywords" => Ok(Self::Keywords(payload("keywords", envelope.data)?)),
            other => Err(DecodeError::UnknownType(other.to_string())),
        }
    }
}
