// Microphone capture backend using cpal

use anyhow::{anyhow, bail, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SampleFormat;
use std::thread;
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

use super::capture::{AudioFrame, CaptureBackend, CaptureConfig};

/// Microphone backend
///
/// Captures from the default input device at whatever format the device
/// offers and converts to the configured target format (mono 16 kHz by
/// default). The cpal stream is not `Send`, so it lives on a dedicated
/// thread that parks until `stop`.
pub struct MicrophoneBackend {
    config: CaptureConfig,
    worker: Option<CaptureWorker>,
    capturing: bool,
}

struct CaptureWorker {
    shutdown_tx: std::sync::mpsc::Sender<()>,
    thread: thread::JoinHandle<()>,
}

impl MicrophoneBackend {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            worker: None,
            capturing: false,
        }
    }
}

#[async_trait::async_trait]
impl CaptureBackend for MicrophoneBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        if self.capturing {
            bail!("Already capturing");
        }

        info!(
            "Starting microphone capture ({}Hz, {} channels)",
            self.config.sample_rate, self.config.channels
        );

        let (frame_tx, frame_rx) = mpsc::channel(100);
        let (ready_tx, ready_rx) = oneshot::channel::<Result<()>>();
        let (shutdown_tx, shutdown_rx) = std::sync::mpsc::channel::<()>();

        let config = self.config.clone();
        let handle = thread::spawn(move || {
            let stream = match build_input_stream(&config, frame_tx) {
                Ok(stream) => stream,
                Err(e) => {
                    let _ = ready_tx.send(Err(e));
                    return;
                }
            };

            if let Err(e) = stream.play() {
                let _ = ready_tx.send(Err(anyhow!("Failed to start input stream: {e}")));
                return;
            }

            let _ = ready_tx.send(Ok(()));

            // The stream lives as long as this thread; park until stop.
            let _ = shutdown_rx.recv();
            drop(stream);
        });

        match ready_rx.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                let _ = handle.join();
                return Err(e.context("Failed to acquire microphone"));
            }
            Err(_) => bail!("Capture thread exited before reporting readiness"),
        }

        self.worker = Some(CaptureWorker {
            shutdown_tx,
            thread: handle,
        });
        self.capturing = true;

        info!("Microphone capture started");

        Ok(frame_rx)
    }

    async fn stop(&mut self) -> Result<()> {
        if !self.capturing {
            return Ok(());
        }

        info!("Stopping microphone capture");

        if let Some(worker) = self.worker.take() {
            let _ = worker.shutdown_tx.send(());
            if worker.thread.join().is_err() {
                warn!("Capture thread panicked during shutdown");
            }
        }

        self.capturing = false;

        info!("Microphone capture stopped");

        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }

    fn name(&self) -> &str {
        "microphone (cpal)"
    }
}

/// Open the default input device and wire its callback to the frame channel.
fn build_input_stream(
    config: &CaptureConfig,
    frame_tx: mpsc::Sender<AudioFrame>,
) -> Result<cpal::Stream> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| anyhow!("no input device available"))?;

    let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());
    let supported = device
        .default_input_config()
        .context("Failed to query input device config")?;

    info!(
        "Using input device '{}' ({}Hz, {} channels, {:?})",
        device_name,
        supported.sample_rate().0,
        supported.channels(),
        supported.sample_format()
    );

    let device_config: cpal::StreamConfig = supported.config();
    let mut assembler = FrameAssembler::new(
        config.clone(),
        device_config.sample_rate.0,
        device_config.channels,
        frame_tx,
    );

    let err_fn = |err| warn!("Input stream error: {}", err);

    let stream = match supported.sample_format() {
        SampleFormat::F32 => device.build_input_stream(
            &device_config,
            move |data: &[f32], _| {
                assembler.push(data.iter().map(|&s| {
                    (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
                }));
            },
            err_fn,
            None,
        )?,
        SampleFormat::I16 => device.build_input_stream(
            &device_config,
            move |data: &[i16], _| {
                assembler.push(data.iter().copied());
            },
            err_fn,
            None,
        )?,
        SampleFormat::U16 => device.build_input_stream(
            &device_config,
            move |data: &[u16], _| {
                assembler.push(data.iter().map(|&s| (s as i32 - 32768) as i16));
            },
            err_fn,
            None,
        )?,
        other => bail!("unsupported sample format: {other:?}"),
    };

    Ok(stream)
}

/// Accumulates device-format samples and emits target-format frames.
struct FrameAssembler {
    target: CaptureConfig,
    device_rate: u32,
    device_channels: u16,
    pending: Vec<i16>,
    block_len: usize,
    frames_emitted: u64,
    tx: mpsc::Sender<AudioFrame>,
}

impl FrameAssembler {
    fn new(
        target: CaptureConfig,
        device_rate: u32,
        device_channels: u16,
        tx: mpsc::Sender<AudioFrame>,
    ) -> Self {
        let block_len = (device_rate as u64 * target.buffer_duration_ms / 1000) as usize
            * device_channels as usize;

        Self {
            target,
            device_rate,
            device_channels,
            pending: Vec::with_capacity(block_len * 2),
            block_len,
            frames_emitted: 0,
            tx,
        }
    }

    fn push(&mut self, samples: impl Iterator<Item = i16>) {
        self.pending.extend(samples);

        while self.pending.len() >= self.block_len {
            let block: Vec<i16> = self.pending.drain(..self.block_len).collect();
            let frame = self.convert(block);

            // try_send: this runs on the audio callback thread.
            if self.tx.try_send(frame).is_err() {
                warn!("Frame channel full or closed, dropping audio frame");
            }
        }
    }

    fn convert(&mut self, block: Vec<i16>) -> AudioFrame {
        let (samples, channels) = if self.target.channels == 1 && self.device_channels > 1 {
            (downmix_to_mono(&block, self.device_channels), 1)
        } else {
            (block, self.device_channels)
        };

        let samples = resample_nearest(&samples, self.device_rate, self.target.sample_rate);

        let timestamp_ms = self.frames_emitted * self.target.buffer_duration_ms;
        self.frames_emitted += 1;

        AudioFrame {
            samples,
            sample_rate: self.target.sample_rate,
            channels,
            timestamp_ms,
        }
    }
}

/// Sum interleaved channels into mono (no division, to preserve volume)
fn downmix_to_mono(samples: &[i16], channels: u16) -> Vec<i16> {
    let width = channels as usize;
    let mut mono = Vec::with_capacity(samples.len() / width);

    for group in samples.chunks_exact(width) {
        let sum: i32 = group.iter().map(|&s| s as i32).sum();
        mono.push(sum.clamp(i16::MIN as i32, i16::MAX as i32) as i16);
    }

    mono
}

/// Nearest-sample resampling; adequate for speech sent to an STT pipeline.
fn resample_nearest(samples: &[i16], from_rate: u32, to_rate: u32) -> Vec<i16> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let out_len = (samples.len() as u64 * to_rate as u64 / from_rate as u64) as usize;
    (0..out_len)
        .map(|i| samples[(i as u64 * from_rate as u64 / to_rate as u64) as usize])
        .collect()
}
