use std::sync::Arc;
use tokio::sync::{mpsc, watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::clock::SessionClock;
use super::config::SessionConfig;
use crate::audio::{CaptureBackend, ChunkScheduler};
use crate::dashboard::{MeetingState, MessageRouter};
use crate::error::SessionError;
use crate::transport::{InboundFrame, StreamTransport};

/// Lifecycle state of the recording controller.
///
/// `Starting` and `Stopping` are the in-flight transitions; only one can
/// exist at a time, and a `toggle` that lands during either is ignored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Idle,
    Starting,
    Recording,
    Stopping,
}

/// One recording lifecycle from start to stop.
#[derive(Debug, Clone)]
pub struct Session {
    /// Opaque identifier, fresh for every start
    pub id: String,

    /// Language code sent in this session's handshake
    pub language: String,
}

impl Session {
    fn new(language: String) -> Self {
        Self {
            id: format!("meeting-{}", Uuid::new_v4()),
            language,
        }
    }
}

#[derive(Default)]
struct Inner {
    state: SessionState,
    language: String,
    session: Option<Session>,
    cancel_tx: Option<watch::Sender<bool>>,
    scheduler_task: Option<JoinHandle<()>>,
    forward_task: Option<JoinHandle<()>>,
}

enum Transition {
    Start(Session),
    Stop(StopParts),
    Ignore,
}

struct StopParts {
    session: Option<Session>,
    cancel_tx: Option<watch::Sender<bool>>,
    scheduler_task: Option<JoinHandle<()>>,
    forward_task: Option<JoinHandle<()>>,
}

/// Top-level coordinator for the live dashboard core.
///
/// Owns the one piece of mutable lifecycle state: an explicit
/// Idle/Starting/Recording/Stopping machine driving capture, chunking and
/// the session handshake over one injected transport. Inbound routing is
/// wired once at construction and outlives individual sessions, so
/// results that arrive after recording stops are still appended.
pub struct RecordingController {
    transport: Arc<StreamTransport>,
    capture: Mutex<Box<dyn CaptureBackend>>,
    dashboard: MeetingState,
    clock: SessionClock,
    elapsed_rx: watch::Receiver<String>,
    config: SessionConfig,
    inner: Mutex<Inner>,
}

impl RecordingController {
    /// Build the controller and wire the inbound pipeline.
    ///
    /// Spawns the message router, the result collector and the elapsed
    /// ticker; all three run for the life of the controller regardless of
    /// recording state.
    pub fn new(
        transport: StreamTransport,
        inbound: mpsc::UnboundedReceiver<InboundFrame>,
        capture: Box<dyn CaptureBackend>,
        config: SessionConfig,
    ) -> Self {
        let (router, streams) = MessageRouter::new();
        tokio::spawn(router.run(inbound));

        let dashboard = MeetingState::new();
        tokio::spawn(dashboard.clone().collect(streams));

        let clock = SessionClock::new();
        let elapsed_rx = clock.spawn_ticker();

        let inner = Inner {
            language: config.language.clone(),
            ..Inner::default()
        };

        info!("Recording controller ready (language={})", config.language);

        Self {
            transport: Arc::new(transport),
            capture: Mutex::new(capture),
            dashboard,
            clock,
            elapsed_rx,
            config,
            inner: Mutex::new(inner),
        }
    }

    /// Flip between idle and recording.
    ///
    /// From `Idle` this starts a new session: the transport must be open
    /// (`TransportNotReady` otherwise) and the capture resource must be
    /// acquirable (`CaptureDenied` otherwise); both failures leave the
    /// controller idle. From `Recording` it stops the session. A call
    /// that lands while a transition is already in flight is a logged
    /// no-op.
    pub async fn toggle(&self) -> Result<(), SessionError> {
        let transition = {
            let mut inner = self.inner.lock().await;
            match inner.state {
                SessionState::Idle => {
                    if !self.transport.is_open() {
                        warn!("Cannot start recording: backend connection is not open");
                        return Err(SessionError::TransportNotReady);
                    }

                    let session = Session::new(inner.language.clone());
                    inner.state = SessionState::Starting;
                    inner.session = Some(session.clone());
                    Transition::Start(session)
                }
                SessionState::Recording => {
                    inner.state = SessionState::Stopping;
                    Transition::Stop(StopParts {
                        session: inner.session.take(),
                        cancel_tx: inner.cancel_tx.take(),
                        scheduler_task: inner.scheduler_task.take(),
                        forward_task: inner.forward_task.take(),
                    })
                }
                SessionState::Starting | SessionState::Stopping => {
                    warn!("Toggle ignored: {:?} transition in flight", inner.state);
                    Transition::Ignore
                }
            }
        };

        match transition {
            Transition::Start(session) => self.start_session(session).await,
            Transition::Stop(parts) => {
                self.stop_session(parts).await;
                Ok(())
            }
            Transition::Ignore => Ok(()),
        }
    }

    /// Clear everything a previous session accumulated.
    ///
    /// Only valid from `Idle`; anywhere else it is a logged no-op. The
    /// clock and all five panels are cleared in one critical section, so
    /// a concurrent toggle observes either all of it or none of it.
    pub async fn reset(&self) {
        let mut inner = self.inner.lock().await;
        if inner.state != SessionState::Idle {
            warn!("Reset ignored while {:?}", inner.state);
            return;
        }

        inner.session = None;
        self.clock.reset().await;
        self.dashboard.reset().await;

        info!("Session reset");
    }

    pub async fn is_recording(&self) -> bool {
        self.inner.lock().await.state == SessionState::Recording
    }

    /// Whether a start or stop transition is currently in flight.
    pub async fn is_loading(&self) -> bool {
        matches!(
            self.inner.lock().await.state,
            SessionState::Starting | SessionState::Stopping
        )
    }

    pub async fn state(&self) -> SessionState {
        self.inner.lock().await.state
    }

    /// The active session, while one exists.
    pub async fn session(&self) -> Option<Session> {
        self.inner.lock().await.session.clone()
    }

    /// Whether the backend connection is still live. Once this goes
    /// false it stays false; starting again needs a new transport.
    pub fn is_connected(&self) -> bool {
        self.transport.is_open()
    }

    /// Set the language for subsequent sessions. The active session, if
    /// any, keeps the language it was started with.
    pub async fn set_language(&self, language: impl Into<String>) {
        let language = language.into();
        info!("Session language set to {}", language);
        self.inner.lock().await.language = language;
    }

    /// Accumulated dashboard results (the polling surface for panels).
    pub fn dashboard(&self) -> &MeetingState {
        &self.dashboard
    }

    /// Elapsed session time as currently displayed.
    pub async fn elapsed_text(&self) -> String {
        self.clock.elapsed_text().await
    }

    /// Subscribe to the 1 s elapsed-time ticker.
    pub fn elapsed_updates(&self) -> watch::Receiver<String> {
        self.elapsed_rx.clone()
    }

    async fn start_session(&self, session: Session) -> Result<(), SessionError> {
        info!(
            "Starting session {} (language={})",
            session.id, session.language
        );

        // The handshake goes out before the scheduler exists, so no chunk
        // of this session can ever precede it on the wire.
        if let Err(e) = self.transport.send_config(&session.language) {
            warn!("Failed to send session config: {}", e);
            self.abort_start().await;
            return Err(SessionError::TransportNotReady);
        }

        let frames = {
            let mut capture = self.capture.lock().await;
            match capture.start().await {
                Ok(frames) => frames,
                Err(e) => {
                    self.abort_start().await;
                    return Err(SessionError::CaptureDenied(e));
                }
            }
        };

        self.clock.start().await;

        let (cancel_tx, cancel_rx) = watch::channel(false);
        let (chunks_tx, mut chunks_rx) = mpsc::unbounded_channel();

        let scheduler = ChunkScheduler::new(self.config.chunk_cadence);
        let scheduler_task = tokio::spawn(async move {
            scheduler.run(frames, chunks_tx, cancel_rx).await;
        });

        let transport = Arc::clone(&self.transport);
        let forward_task = tokio::spawn(async move {
            while let Some(chunk) = chunks_rx.recv().await {
                transport.send_chunk(chunk);
            }
        });

        let mut inner = self.inner.lock().await;
        inner.state = SessionState::Recording;
        inner.cancel_tx = Some(cancel_tx);
        inner.scheduler_task = Some(scheduler_task);
        inner.forward_task = Some(forward_task);

        info!("Recording started (session {})", session.id);
        Ok(())
    }

    async fn stop_session(&self, parts: StopParts) {
        let session_id = parts
            .session
            .map(|session| session.id)
            .unwrap_or_else(|| "unknown".to_string());

        info!("Stopping session {}", session_id);

        // Cancel the cadence first: once the scheduler has exited, no
        // further chunk can be produced, and whatever was mid-capture is
        // discarded.
        if let Some(cancel_tx) = parts.cancel_tx {
            let _ = cancel_tx.send(true);
        }
        if let Some(task) = parts.scheduler_task {
            if task.await.is_err() {
                error!("Chunk scheduler panicked");
            }
        }

        // Then release the capture resource.
        {
            let mut capture = self.capture.lock().await;
            if let Err(e) = capture.stop().await {
                error!("Failed to release capture: {}", e);
            }
        }

        // The scheduler dropped its chunk sender; the forwarder drains
        // anything already emitted and ends.
        if let Some(task) = parts.forward_task {
            if task.await.is_err() {
                error!("Chunk forwarder panicked");
            }
        }

        self.inner.lock().await.state = SessionState::Idle;

        info!("Recording stopped (session {})", session_id);
    }

    async fn abort_start(&self) {
        let mut inner = self.inner.lock().await;
        inner.state = SessionState::Idle;
        inner.session = None;
    }
}
