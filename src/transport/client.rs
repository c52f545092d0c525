use anyhow::{Context, Result};
use futures::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info};

use super::messages::ControlMessage;
use crate::audio::AudioChunk;

/// A frame received over the connection, exactly as the peer sent it.
pub type InboundFrame = Vec<u8>;

enum OutboundFrame {
    Control(String),
    Audio(Vec<u8>),
}

/// The single duplex connection to the processing backend.
///
/// Connected once when the owning dashboard comes up and never
/// re-established around individual recording sessions. All writes go
/// through one writer task, so a session's config handshake and its audio
/// chunks can never interleave and always keep their enqueue order on the
/// wire. Once the connection drops, `is_open` stays false; starting a new
/// session requires a new transport.
pub struct StreamTransport {
    outbound_tx: mpsc::UnboundedSender<OutboundFrame>,
    open: Arc<AtomicBool>,
}

impl StreamTransport {
    /// Connect to the backend and start the reader/writer tasks.
    ///
    /// Returns the transport plus the receiver of raw inbound frames,
    /// which are handed over verbatim for the router to decode.
    pub async fn connect(url: &str) -> Result<(Self, mpsc::UnboundedReceiver<InboundFrame>)> {
        info!("Connecting to processing backend at {}", url);

        let (ws, _) = connect_async(url)
            .await
            .context("Failed to connect to processing backend")?;

        info!("Backend connection established");

        let (mut sink, mut stream) = ws.split();
        let open = Arc::new(AtomicBool::new(true));
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<OutboundFrame>();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<InboundFrame>();

        // Writer: the only task that touches the sink.
        let writer_open = Arc::clone(&open);
        tokio::spawn(async move {
            while let Some(frame) = outbound_rx.recv().await {
                let message = match frame {
                    OutboundFrame::Control(text) => Message::Text(text),
                    OutboundFrame::Audio(bytes) => Message::Binary(bytes),
                };
                if let Err(e) = sink.send(message).await {
                    error!("Backend send failed: {}", e);
                    writer_open.store(false, Ordering::SeqCst);
                    break;
                }
            }
            debug!("Backend writer stopped");
        });

        // Reader: forwards every data frame until the peer goes away.
        let reader_open = Arc::clone(&open);
        tokio::spawn(async move {
            while let Some(next) = stream.next().await {
                match next {
                    Ok(Message::Text(text)) => {
                        if inbound_tx.send(text.into_bytes()).is_err() {
                            break;
                        }
                    }
                    Ok(Message::Binary(bytes)) => {
                        if inbound_tx.send(bytes).is_err() {
                            break;
                        }
                    }
                    Ok(Message::Close(frame)) => {
                        info!("Backend closed the connection: {:?}", frame);
                        break;
                    }
                    // Ping/pong are answered by the library.
                    Ok(_) => {}
                    Err(e) => {
                        error!("Backend connection error: {}", e);
                        break;
                    }
                }
            }
            reader_open.store(false, Ordering::SeqCst);
            info!("Backend connection reader stopped");
        });

        Ok((Self { outbound_tx, open }, inbound_rx))
    }

    /// Whether the connection is still believed to be live.
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    /// Send the session configuration handshake.
    ///
    /// Must be enqueued before the session's scheduler starts producing
    /// chunks; the writer queue preserves that order on the wire.
    pub fn send_config(&self, language: &str) -> Result<()> {
        anyhow::ensure!(self.is_open(), "connection is not open");

        let message = ControlMessage::Config {
            language: language.to_string(),
        };
        let text = serde_json::to_string(&message).context("Failed to encode config message")?;

        self.outbound_tx
            .send(OutboundFrame::Control(text))
            .map_err(|_| anyhow::anyhow!("connection writer is gone"))?;

        info!("Sent session config (language={})", language);
        Ok(())
    }

    /// Send one audio chunk, fire-and-forget.
    ///
    /// When the connection is not open the chunk is dropped on the floor:
    /// no queueing, no retry.
    pub fn send_chunk(&self, chunk: AudioChunk) {
        let bytes = chunk.payload.len();

        if !self.is_open() {
            debug!("Connection not open, dropping audio chunk ({} bytes)", bytes);
            return;
        }

        if self.outbound_tx.send(OutboundFrame::Audio(chunk.payload)).is_err() {
            debug!("Connection writer gone, dropping audio chunk ({} bytes)", bytes);
            return;
        }

        debug!("Queued audio chunk ({} bytes, {})", bytes, chunk.encoding);
    }
}
