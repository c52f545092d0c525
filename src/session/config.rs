use std::time::Duration;

/// Configuration shared by every session a controller starts
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Language code sent in the session handshake (e.g. "en")
    pub language: String,

    /// How much audio goes into each outbound chunk
    /// Default: 5000 ms
    pub chunk_cadence: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            chunk_cadence: Duration::from_millis(5000),
        }
    }
}
