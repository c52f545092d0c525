use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use super::capture::AudioFrame;

/// Fixed identifier for the chunk payload encoding.
pub const CHUNK_ENCODING: &str = "audio/pcm;codecs=s16le";

/// One bounded unit of captured audio, sent as a single outbound frame.
///
/// Sequence is implicit in send order; a chunk is consumed exactly once
/// by the transport and never buffered beyond its own cadence window.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// Little-endian i16 PCM bytes
    pub payload: Vec<u8>,
    /// Fixed codec identifier
    pub encoding: &'static str,
}

/// Chunk scheduler
///
/// Buffers capture frames and emits exactly one chunk per cadence tick.
/// The interval's first tick fires immediately on entering recording, so
/// audio that is already available goes out without waiting a full
/// window; empty buffers are skipped rather than sent as zero-length
/// chunks.
pub struct ChunkScheduler {
    cadence: Duration,
}

impl ChunkScheduler {
    pub fn new(cadence: Duration) -> Self {
        Self { cadence }
    }

    /// Consume capture frames until cancelled and hand completed chunks on.
    ///
    /// Cancellation wins over any concurrently-ready tick and discards
    /// whatever is mid-capture: delivery is at-most-once with no
    /// end-of-stream flush. The frame channel closing (capture released)
    /// ends the run the same way. Returns the number of chunks emitted.
    pub async fn run(
        self,
        mut frames: mpsc::Receiver<AudioFrame>,
        chunks: mpsc::UnboundedSender<AudioChunk>,
        mut cancel: watch::Receiver<bool>,
    ) -> usize {
        let mut ticker = tokio::time::interval(self.cadence);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut buffer: Vec<u8> = Vec::new();
        let mut emitted = 0usize;

        info!(
            "Chunk scheduler started ({}ms cadence)",
            self.cadence.as_millis()
        );

        loop {
            tokio::select! {
                biased;

                _ = cancel.changed() => {
                    if !buffer.is_empty() {
                        debug!("Discarding {} buffered bytes at cancellation", buffer.len());
                    }
                    break;
                }

                frame = frames.recv() => match frame {
                    Some(frame) => {
                        buffer.reserve(frame.samples.len() * 2);
                        for sample in &frame.samples {
                            buffer.extend_from_slice(&sample.to_le_bytes());
                        }
                    }
                    None => break,
                },

                _ = ticker.tick() => {
                    if buffer.is_empty() {
                        continue;
                    }

                    let chunk = AudioChunk {
                        payload: std::mem::take(&mut buffer),
                        encoding: CHUNK_ENCODING,
                    };

                    debug!("Chunk {} complete ({} bytes)", emitted, chunk.payload.len());

                    if chunks.send(chunk).is_err() {
                        break;
                    }
                    emitted += 1;
                }
            }
        }

        info!("Chunk scheduler stopped ({} chunks emitted)", emitted);

        emitted
    }
}
