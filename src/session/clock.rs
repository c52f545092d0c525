use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex};
use tokio::time::{Instant, MissedTickBehavior};

/// Elapsed display before a session has started or after a reset.
pub const ZERO_ELAPSED: &str = "00:00";

const TICK: Duration = Duration::from_secs(1);

/// Tracks when the current session started and formats elapsed time.
///
/// The start instant survives the end of recording: the dashboard keeps
/// counting up until an explicit reset takes it back to `00:00`. Each
/// session start overwrites the previous instant. Clones share the same
/// instant.
#[derive(Clone, Default)]
pub struct SessionClock {
    started_at: Arc<Mutex<Option<Instant>>>,
}

impl SessionClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the session start instant.
    pub async fn start(&self) {
        *self.started_at.lock().await = Some(Instant::now());
    }

    /// Forget the start instant; elapsed time returns to `00:00`.
    pub async fn reset(&self) {
        *self.started_at.lock().await = None;
    }

    pub async fn is_started(&self) -> bool {
        self.started_at.lock().await.is_some()
    }

    /// Current elapsed time as `MM:SS`, zero-padded, minutes unbounded.
    pub async fn elapsed_text(&self) -> String {
        match *self.started_at.lock().await {
            Some(started_at) => format_elapsed(started_at.elapsed()),
            None => ZERO_ELAPSED.to_string(),
        }
    }

    /// Publish the formatted elapsed time once a second.
    ///
    /// The ticker runs on its own 1 s cadence, independent of the chunk
    /// cadence, and keeps going after recording stops because it follows
    /// the persisted start instant. It exits once every subscriber is
    /// gone.
    pub fn spawn_ticker(&self) -> watch::Receiver<String> {
        let (tx, rx) = watch::channel(ZERO_ELAPSED.to_string());
        let clock = self.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(TICK);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = tx.closed() => break,
                    _ = ticker.tick() => {
                        if tx.send(clock.elapsed_text().await).is_err() {
                            break;
                        }
                    }
                }
            }
        });

        rx
    }
}

fn format_elapsed(elapsed: Duration) -> String {
    let total_secs = elapsed.as_secs();
    format!("{:02}:{:02}", total_secs / 60, total_secs % 60)
}
