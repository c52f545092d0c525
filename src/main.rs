use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use meetstream::{
    CaptureBackendFactory, CaptureSource, Config, RecordingController, StreamTransport,
};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Headless console dashboard: streams microphone audio to the
/// processing backend and prints transcript, translation, summary,
/// question and keyword results as they arrive.
#[derive(Debug, Parser)]
#[command(name = "meetstream", version)]
struct Args {
    /// Config file to load (defaults apply when omitted)
    #[arg(long)]
    config: Option<String>,

    /// Backend WebSocket endpoint (overrides the config file)
    #[arg(long)]
    endpoint: Option<String>,

    /// Language code for the session handshake (overrides the config file)
    #[arg(long)]
    language: Option<String>,

    /// Where the audio comes from
    #[arg(long, value_enum, default_value_t = CaptureArg::Mic)]
    capture: CaptureArg,

    /// Write the meeting export to this file on shutdown
    #[arg(long)]
    export: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum CaptureArg {
    /// Default input device
    Mic,
    /// Built-in tone generator (no hardware needed)
    Synthetic,
}

impl From<CaptureArg> for CaptureSource {
    fn from(arg: CaptureArg) -> Self {
        match arg {
            CaptureArg::Mic => CaptureSource::Microphone,
            CaptureArg::Synthetic => CaptureSource::Synthetic,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let cfg = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    let endpoint = args
        .endpoint
        .clone()
        .unwrap_or_else(|| cfg.endpoint.url.clone());

    let mut session_config = cfg.session_config();
    if let Some(language) = &args.language {
        session_config.language = language.clone();
    }

    info!("meetstream v0.1.0");
    info!("Backend endpoint: {}", endpoint);
    info!("Session language: {}", session_config.language);

    let (transport, inbound) = StreamTransport::connect(&endpoint).await?;

    let capture = CaptureBackendFactory::create(args.capture.into(), cfg.capture_config());
    info!("Capture backend: {}", capture.name());

    let controller = RecordingController::new(transport, inbound, capture, session_config);

    controller
        .toggle()
        .await
        .context("Failed to start recording")?;

    println!("Recording. Press Ctrl-C to stop.");

    let mut elapsed = controller.elapsed_updates();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = elapsed.changed() => {
                if changed.is_err() {
                    break;
                }
                print!("\r[{}] ", *elapsed.borrow());
                let _ = std::io::stdout().flush();
            }
        }
    }
    println!();

    if controller.is_recording().await {
        let _ = controller.toggle().await;
    }

    let duration = controller.elapsed_text().await;
    info!("Session ended at {}", duration);

    if let Some(path) = &args.export {
        controller.dashboard().export_to(path, duration).await?;
        println!("Meeting export written to {}", path.display());
    }

    Ok(())
}
