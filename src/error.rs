use thiserror::Error;

/// Errors surfaced to the caller by the recording lifecycle.
///
/// Decode-level failures on inbound frames are not represented here: the
/// router logs and drops them without disturbing the session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Recording was started while the backend connection is not open.
    /// Non-fatal; the session stays idle.
    #[error("backend connection is not open")]
    TransportNotReady,

    /// The audio capture resource could not be acquired (missing device,
    /// permission failure, stream error). The session reverts to idle.
    #[error("audio capture unavailable: {0}")]
    CaptureDenied(#[source] anyhow::Error),
}

/// Why an inbound frame could not be turned into a result message.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The frame is not valid JSON or not an object with a `type` field.
    #[error("malformed frame: {0}")]
    Malformed(#[from] serde_json::Error),

    /// The tag was recognized but the `data` payload has the wrong shape.
    #[error("bad `{kind}` payload: {source}")]
    BadPayload {
        kind: String,
        #[source]
        source: serde_json::Error,
    },

    /// The `type` tag is not one the dashboard knows about.
    #[error("unknown message type: {0}")]
    UnknownType(String),
}
