// Synthetic capture backend: a tone generator standing in for a microphone

use anyhow::{bail, Result};
use std::f32::consts::TAU;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::info;

use super::capture::{AudioFrame, CaptureBackend, CaptureConfig};

const TONE_HZ: f32 = 440.0;
const TONE_AMPLITUDE: f32 = 0.2;

/// Synthetic backend
///
/// Emits sine-wave PCM frames on the configured cadence so the pipeline
/// can run end-to-end with no audio hardware. Used by the demo binary and
/// by tests that need a well-behaved capture collaborator.
pub struct SyntheticBackend {
    config: CaptureConfig,
    stop_tx: Option<watch::Sender<bool>>,
    task: Option<JoinHandle<()>>,
    capturing: bool,
}

impl SyntheticBackend {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            stop_tx: None,
            task: None,
            capturing: false,
        }
    }
}

#[async_trait::async_trait]
impl CaptureBackend for SyntheticBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        if self.capturing {
            bail!("Already capturing");
        }

        let (frame_tx, frame_rx) = mpsc::channel(100);
        let (stop_tx, mut stop_rx) = watch::channel(false);

        let config = self.config.clone();
        let task = tokio::spawn(async move {
            let samples_per_frame = config.samples_per_frame();
            let phase_step = TAU * TONE_HZ / config.sample_rate as f32;
            let mut phase = 0.0f32;
            let mut timestamp_ms = 0u64;

            let mut ticker =
                tokio::time::interval(Duration::from_millis(config.buffer_duration_ms));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = stop_rx.changed() => break,
                    _ = ticker.tick() => {
                        let samples: Vec<i16> = (0..samples_per_frame)
                            .map(|_| {
                                phase = (phase + phase_step) % TAU;
                                (phase.sin() * TONE_AMPLITUDE * i16::MAX as f32) as i16
                            })
                            .collect();

                        let frame = AudioFrame {
                            samples,
                            sample_rate: config.sample_rate,
                            channels: config.channels,
                            timestamp_ms,
                        };

                        if frame_tx.send(frame).await.is_err() {
                            break;
                        }

                        timestamp_ms += config.buffer_duration_ms;
                    }
                }
            }
        });

        self.stop_tx = Some(stop_tx);
        self.task = Some(task);
        self.capturing = true;

        info!("Synthetic capture started ({}Hz tone)", TONE_HZ);

        Ok(frame_rx)
    }

    async fn stop(&mut self) -> Result<()> {
        if !self.capturing {
            return Ok(());
        }

        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(true);
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }

        self.capturing = false;

        info!("Synthetic capture stopped");

        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }

    fn name(&self) -> &str {
        "synthetic tone"
    }
}
