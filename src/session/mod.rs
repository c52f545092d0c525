//! Recording session lifecycle
//!
//! This module provides the `RecordingController` abstraction that manages:
//! - The Idle/Starting/Recording/Stopping state machine
//! - The session configuration handshake over the shared transport
//! - Audio capture acquisition and the chunk cadence
//! - Elapsed session time (`SessionClock`)

mod clock;
mod config;
mod controller;

pub use clock::{SessionClock, ZERO_ELAPSED};
pub use config::SessionConfig;
pub use controller::{RecordingController, Session, SessionState};
