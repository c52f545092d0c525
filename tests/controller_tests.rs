// Integration tests for the recording controller
//
// A real WebSocket backend runs on a loopback port; capture hardware is
// replaced by scripted in-process backends so the session state machine
// can be exercised deterministically.

use std::time::Duration;

use anyhow::{bail, Result};
use futures::{SinkExt, StreamExt};
use meetstream::session::ZERO_ELAPSED;
use meetstream::{
    AudioFrame, CaptureBackend, CaptureBackendFactory, CaptureConfig, CaptureSource,
    RecordingController, SessionConfig, SessionError, SessionState, StreamTransport,
};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;

const WAIT: Duration = Duration::from_secs(5);

/// A one-client backend stand-in: records every frame the client sends
/// and relays frames pushed through the returned sender. Dropping the
/// sender closes the connection from the server side.
async fn start_backend() -> Result<(
    String,
    mpsc::UnboundedReceiver<Message>,
    mpsc::UnboundedSender<Message>,
)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let url = format!("ws://{}", listener.local_addr()?);

    let (seen_tx, seen_rx) = mpsc::unbounded_channel();
    let (push_tx, mut push_rx) = mpsc::unbounded_channel::<Message>();

    tokio::spawn(async move {
        let Ok((stream, _)) = listener.accept().await else {
            return;
        };
        let Ok(ws) = accept_async(stream).await else {
            return;
        };
        let (mut sink, mut stream) = ws.split();

        loop {
            tokio::select! {
                inbound = stream.next() => match inbound {
                    Some(Ok(message)) => {
                        if message.is_text() || message.is_binary() {
                            let _ = seen_tx.send(message);
                        }
                    }
                    _ => break,
                },
                outbound = push_rx.recv() => match outbound {
                    Some(message) => {
                        if sink.send(message).await.is_err() {
                            break;
                        }
                    }
                    None => {
                        let _ = sink.close().await;
                        break;
                    }
                },
            }
        }
    });

    Ok((url, seen_rx, push_tx))
}

/// Poll a condition until it holds or the wait budget runs out.
async fn eventually<F, Fut>(what: &str, check: F)
where
    F: Fn() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let poll = async {
        while !check().await {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    };
    if timeout(WAIT, poll).await.is_err() {
        panic!("timed out waiting for {}", what);
    }
}

/// Capture that acquires cleanly but never produces a frame.
struct SilentCapture {
    frames_tx: Option<mpsc::Sender<AudioFrame>>,
}

impl SilentCapture {
    fn boxed() -> Box<dyn CaptureBackend> {
        Box::new(Self { frames_tx: None })
    }
}

#[async_trait::async_trait]
impl CaptureBackend for SilentCapture {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        let (tx, rx) = mpsc::channel(16);
        self.frames_tx = Some(tx);
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        self.frames_tx = None;
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.frames_tx.is_some()
    }

    fn name(&self) -> &str {
        "silent"
    }
}

/// Capture whose acquisition always fails, like a denied permission
/// prompt.
struct DeniedCapture;

#[async_trait::async_trait]
impl CaptureBackend for DeniedCapture {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        bail!("microphone permission denied")
    }

    async fn stop(&mut self) -> Result<()> {
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        false
    }

    fn name(&self) -> &str {
        "denied"
    }
}

/// Capture that holds `start` open until the test releases the gate,
/// pinning the controller in its starting transition.
struct GatedCapture {
    gate: Option<oneshot::Receiver<()>>,
    frames_tx: Option<mpsc::Sender<AudioFrame>>,
}

impl GatedCapture {
    fn boxed(gate: oneshot::Receiver<()>) -> Box<dyn CaptureBackend> {
        Box::new(Self {
            gate: Some(gate),
            frames_tx: None,
        })
    }
}

#[async_trait::async_trait]
impl CaptureBackend for GatedCapture {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        if let Some(gate) = self.gate.take() {
            let _ = gate.await;
        }
        let (tx, rx) = mpsc::channel(16);
        self.frames_tx = Some(tx);
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        self.frames_tx = None;
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.frames_tx.is_some()
    }

    fn name(&self) -> &str {
        "gated"
    }
}

fn session_config() -> SessionConfig {
    SessionConfig {
        language: "en".to_string(),
        chunk_cadence: Duration::from_millis(50),
    }
}

async fn start_controller(
    capture: Box<dyn CaptureBackend>,
) -> Result<(
    RecordingController,
    mpsc::UnboundedReceiver<Message>,
    mpsc::UnboundedSender<Message>,
)> {
    let (url, seen, push) = start_backend().await?;
    let (transport, inbound) = StreamTransport::connect(&url).await?;
    let controller = RecordingController::new(transport, inbound, capture, session_config());
    Ok((controller, seen, push))
}

fn result_frame(kind: &str, data: serde_json::Value) -> Message {
    Message::Text(serde_json::json!({ "type": kind, "data": data }).to_string())
}

#[tokio::test]
async fn test_toggle_alternates_between_idle_and_recording() -> Result<()> {
    let (controller, _seen, _push) = start_controller(SilentCapture::boxed()).await?;

    assert_eq!(controller.state().await, SessionState::Idle);
    assert!(!controller.is_recording().await);
    assert!(controller.session().await.is_none());

    controller.toggle().await?;
    assert_eq!(controller.state().await, SessionState::Recording);
    assert!(controller.is_recording().await);
    let session = controller.session().await.expect("active session");
    assert!(
        session.id.starts_with("meeting-"),
        "unexpected session id {}",
        session.id
    );

    controller.toggle().await?;
    assert_eq!(controller.state().await, SessionState::Idle);
    assert!(controller.session().await.is_none());

    // The same backend supports another cycle
    controller.toggle().await?;
    assert!(controller.is_recording().await);
    controller.toggle().await?;
    assert_eq!(controller.state().await, SessionState::Idle);

    Ok(())
}

#[tokio::test]
async fn test_start_with_dead_connection_is_rejected() -> Result<()> {
    let (controller, _seen, push) = start_controller(SilentCapture::boxed()).await?;

    // Backend goes away before any session starts
    drop(push);
    let c = &controller;
    eventually("the transport to observe the close", || async move {
        !c.is_connected()
    })
    .await;

    let err = controller.toggle().await.expect_err("start should fail");
    assert!(matches!(err, SessionError::TransportNotReady));
    assert_eq!(controller.state().await, SessionState::Idle);

    Ok(())
}

#[tokio::test]
async fn test_denied_capture_reverts_to_idle() -> Result<()> {
    let (controller, _seen, _push) = start_controller(Box::new(DeniedCapture)).await?;

    let err = controller.toggle().await.expect_err("start should fail");
    assert!(matches!(err, SessionError::CaptureDenied(_)));

    // The failed start leaves no trace
    assert_eq!(controller.state().await, SessionState::Idle);
    assert!(controller.session().await.is_none());
    assert_eq!(controller.elapsed_text().await, ZERO_ELAPSED);

    // And the controller still accepts a later toggle attempt
    let err = controller.toggle().await.expect_err("capture still denied");
    assert!(matches!(err, SessionError::CaptureDenied(_)));

    Ok(())
}

#[tokio::test]
async fn test_reset_clears_accumulated_results() -> Result<()> {
    let (controller, _seen, push) = start_controller(SilentCapture::boxed()).await?;

    controller.toggle().await?;
    push.send(result_frame("transcript", "We shipped on Friday.".into()))?;
    push.send(result_frame(
        "summary",
        "Release recap.\n- Topic: Shipping".into(),
    ))?;
    push.send(result_frame("questions", serde_json::json!(["Ship when?"])))?;
    push.send(result_frame(
        "keywords",
        serde_json::json!([{ "keyword": "RC", "definition": "Release candidate" }]),
    ))?;
    push.send(result_frame("translated", "Enviamos el viernes.".into()))?;

    let state = controller.dashboard();
    eventually("all five panels to fill", || async move {
        !state.transcript().await.is_empty()
            && !state.translated().await.is_empty()
            && !state.summary().await.is_empty()
            && !state.questions().await.is_empty()
            && !state.keywords().await.is_empty()
    })
    .await;

    controller.toggle().await?;
    assert_eq!(controller.state().await, SessionState::Idle);

    controller.reset().await;

    assert!(state.transcript().await.is_empty());
    assert!(state.translated().await.is_empty());
    assert!(state.summary().await.is_empty());
    assert!(state.topics().await.is_empty());
    assert!(state.questions().await.is_empty());
    assert!(state.keywords().await.is_empty());
    assert_eq!(controller.elapsed_text().await, ZERO_ELAPSED);

    Ok(())
}

#[tokio::test]
async fn test_reset_is_ignored_while_recording() -> Result<()> {
    let (controller, _seen, push) = start_controller(SilentCapture::boxed()).await?;

    controller.toggle().await?;
    push.send(result_frame("transcript", "Keep this line.".into()))?;

    let state = controller.dashboard();
    eventually("the transcript line to arrive", || async move {
        !state.transcript().await.is_empty()
    })
    .await;

    // Mid-session reset does nothing
    controller.reset().await;
    assert_eq!(state.transcript().await.len(), 1);
    assert!(controller.is_recording().await);

    // After stopping it works
    controller.toggle().await?;
    controller.reset().await;
    assert!(state.transcript().await.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_results_still_routed_after_stop() -> Result<()> {
    let (controller, _seen, push) = start_controller(SilentCapture::boxed()).await?;

    controller.toggle().await?;
    controller.toggle().await?;
    assert_eq!(controller.state().await, SessionState::Idle);

    // The backend finishes processing the tail of the audio late
    push.send(result_frame("transcript", "One last thought.".into()))?;
    push.send(result_frame(
        "summary",
        "Wrap-up.\n- Topic: Follow-ups".into(),
    ))?;

    let state = controller.dashboard();
    eventually("late results to land", || async move {
        state.transcript().await.len() == 1 && !state.summary().await.is_empty()
    })
    .await;

    assert_eq!(state.transcript().await[0].text, "One last thought.");
    assert_eq!(state.topics().await, vec!["Follow-ups".to_string()]);

    Ok(())
}

#[tokio::test]
async fn test_each_session_sends_its_own_handshake() -> Result<()> {
    let (controller, mut seen, _push) = start_controller(SilentCapture::boxed()).await?;

    controller.toggle().await?;
    let first = controller.session().await.expect("first session");
    controller.toggle().await?;

    controller.set_language("es").await;

    controller.toggle().await?;
    let second = controller.session().await.expect("second session");
    controller.toggle().await?;

    // Silent capture produces no chunks, so the wire carries exactly the
    // two handshakes in session order
    let mut languages = Vec::new();
    for _ in 0..2 {
        let message = timeout(WAIT, seen.recv()).await?.expect("config frame");
        let config: serde_json::Value = serde_json::from_str(message.to_text()?)?;
        assert_eq!(config["type"], "config");
        languages.push(config["language"].as_str().unwrap().to_string());
    }
    assert_eq!(languages, vec!["en", "es"]);

    // Each start minted a fresh identifier
    assert_ne!(first.id, second.id);
    assert_eq!(first.language, "en");
    assert_eq!(second.language, "es");

    Ok(())
}

#[tokio::test]
async fn test_audio_chunks_follow_the_handshake() -> Result<()> {
    // Real tone generator, short frames, fast cadence
    let capture = CaptureBackendFactory::create(
        CaptureSource::Synthetic,
        CaptureConfig {
            sample_rate: 16000,
            channels: 1,
            buffer_duration_ms: 20,
        },
    );
    let (controller, mut seen, _push) = start_controller(capture).await?;

    controller.toggle().await?;

    let first = timeout(WAIT, seen.recv()).await?.expect("config frame");
    assert!(first.is_text(), "handshake must precede all audio");

    let second = timeout(WAIT, seen.recv()).await?.expect("audio frame");
    assert!(second.is_binary());
    let payload = second.into_data();
    assert!(!payload.is_empty());
    assert_eq!(payload.len() % 2, 0, "payload should be whole i16 samples");

    controller.toggle().await?;
    assert_eq!(controller.state().await, SessionState::Idle);

    Ok(())
}

#[tokio::test]
async fn test_toggle_is_ignored_while_starting() -> Result<()> {
    let (gate_tx, gate_rx) = oneshot::channel();
    let (controller, _seen, _push) = start_controller(GatedCapture::boxed(gate_rx)).await?;
    let controller = std::sync::Arc::new(controller);

    let starter = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.toggle().await })
    };

    let c = controller.as_ref();
    eventually("the start transition to begin", || async move {
        c.is_loading().await
    })
    .await;
    assert_eq!(controller.state().await, SessionState::Starting);

    // A toggle landing mid-transition is swallowed
    controller.toggle().await?;
    assert_eq!(controller.state().await, SessionState::Starting);

    // Release the capture gate and the original start completes
    let _ = gate_tx.send(());
    starter.await??;
    assert_eq!(controller.state().await, SessionState::Recording);

    controller.toggle().await?;
    assert_eq!(controller.state().await, SessionState::Idle);

    Ok(())
}

#[tokio::test]
async fn test_clock_runs_until_reset() -> Result<()> {
    let (controller, _seen, _push) = start_controller(SilentCapture::boxed()).await?;

    assert_eq!(controller.elapsed_text().await, ZERO_ELAPSED);

    controller.toggle().await?;

    // The ticker publishes a fresh reading every second
    let mut elapsed = controller.elapsed_updates();
    timeout(WAIT, async {
        loop {
            elapsed.changed().await.expect("ticker alive");
            if *elapsed.borrow() != ZERO_ELAPSED {
                break;
            }
        }
    })
    .await?;

    // Stopping does not freeze or clear the clock
    controller.toggle().await?;
    assert_ne!(controller.elapsed_text().await, ZERO_ELAPSED);

    controller.reset().await;
    assert_eq!(controller.elapsed_text().await, ZERO_ELAPSED);

    Ok(())
}
