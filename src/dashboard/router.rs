use tokio::sync::mpsc;
use tracing::{error, info, warn};

use super::types::{Keyword, Question, SummaryUpdate, TranscriptLine};
use crate::error::DecodeError;
use crate::transport::{InboundFrame, ResultMessage};

/// Demultiplexes inbound result frames into one typed stream per panel.
///
/// Routing never fails outward: frames that do not decode are logged and
/// dropped so one bad message cannot take the session down.
pub struct MessageRouter {
    transcript_tx: mpsc::UnboundedSender<TranscriptLine>,
    translated_tx: mpsc::UnboundedSender<TranscriptLine>,
    summary_tx: mpsc::UnboundedSender<SummaryUpdate>,
    questions_tx: mpsc::UnboundedSender<Vec<Question>>,
    keywords_tx: mpsc::UnboundedSender<Vec<Keyword>>,
}

/// Receiving ends of the router's five output streams
pub struct RouterStreams {
    pub transcript: mpsc::UnboundedReceiver<TranscriptLine>,
    pub translated: mpsc::UnboundedReceiver<TranscriptLine>,
    pub summary: mpsc::UnboundedReceiver<SummaryUpdate>,
    pub questions: mpsc::UnboundedReceiver<Vec<Question>>,
    pub keywords: mpsc::UnboundedReceiver<Vec<Keyword>>,
}

impl MessageRouter {
    pub fn new() -> (Self, RouterStreams) {
        let (transcript_tx, transcript) = mpsc::unbounded_channel();
        let (translated_tx, translated) = mpsc::unbounded_channel();
        let (summary_tx, summary) = mpsc::unbounded_channel();
        let (questions_tx, questions) = mpsc::unbounded_channel();
        let (keywords_tx, keywords) = mpsc::unbounded_channel();

        let router = Self {
            transcript_tx,
            translated_tx,
            summary_tx,
            questions_tx,
            keywords_tx,
        };

        let streams = RouterStreams {
            transcript,
            translated,
            summary,
            questions,
            keywords,
        };

        (router, streams)
    }

    /// Drain inbound frames until the transport closes its channel.
    pub async fn run(self, mut inbound: mpsc::UnboundedReceiver<InboundFrame>) {
        info!("Message router started");

        while let Some(frame) = inbound.recv().await {
            self.route(&frame);
        }

        info!("Message router stopped");
    }

    /// Decode one frame and dispatch by tag.
    pub fn route(&self, frame: &[u8]) {
        let message = match ResultMessage::decode(frame) {
            Ok(message) => message,
            Err(DecodeError::UnknownType(tag)) => {
                warn!("Ignoring message with unknown type '{}'", tag);
                return;
            }
            Err(e) => {
                error!("Dropping undecodable frame: {}", e);
                return;
            }
        };

        match message {
            ResultMessage::Transcript(text) => {
                let _ = self.transcript_tx.send(TranscriptLine::spoken(text));
            }
            ResultMessage::Translated(text) => {
                let _ = self.translated_tx.send(TranscriptLine::translated(text));
            }
            ResultMessage::Summary(raw) => {
                let _ = self.summary_tx.send(SummaryUpdate::from_raw(&raw));
            }
            ResultMessage::Questions(items) => {
                let batch: Vec<Question> =
                    items.into_iter().map(|text| Question { text }).collect();
                let _ = self.questions_tx.send(batch);
            }
            ResultMessage::Keywords(entries) => {
                let batch: Vec<Keyword> = entries.into_iter().map(Keyword::from).collect();
                let _ = self.keywords_tx.send(batch);
            }
        }
    }
}
