pub mod client;
pub mod messages;

pub use client::{InboundFrame, StreamTransport};
pub use messages::{ControlMessage, KeywordEntry, ResultMessage};
