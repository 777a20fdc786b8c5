//! Streams an audio file to the live endpoint and prints transcripts.
//!
//! Usage:
//!
//! ```text
//! DEEPGRAM_API_KEY=... cargo run --example stream_file -- audio.wav [--debug]
//! ```
//!
//! The file is sent in fixed-size chunks at roughly real-time pace, then
//! `CloseStream` asks the service to flush and close.

// ============================================================================
// Imports
// ============================================================================

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, bail};
use listen_live::{ClientOptions, LiveClient, LiveEvent, LiveSchema};
use tracing_subscriber::EnvFilter;

// ============================================================================
// Constants
// ============================================================================

/// Bytes per chunk (100ms of 16kHz 16-bit mono).
const CHUNK_SIZE: usize = 3200;

/// Pause between chunks.
const CHUNK_INTERVAL: Duration = Duration::from_millis(100);

/// Maximum time to wait for the handshake.
const OPEN_TIMEOUT: Duration = Duration::from_secs(10);

// ============================================================================
// Types
// ============================================================================

/// Command-line arguments.
#[derive(Debug, Clone)]
struct Args {
    path: PathBuf,
    debug: bool,
}

impl Args {
    fn parse() -> anyhow::Result<Self> {
        let mut path = None;
        let mut debug = false;
        for arg in std::env::args().skip(1) {
            if arg == "--debug" {
                debug = true;
            } else {
                path = Some(PathBuf::from(arg));
            }
        }
        let path = path.context("usage: stream_file <audio file> [--debug]")?;
        Ok(Self { path, debug })
    }
}

// ============================================================================
// Functions
// ============================================================================

fn init_logging(debug: bool) {
    let filter = if debug {
        "listen_live=debug"
    } else {
        "listen_live=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_target(false)
        .init();
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse()?;
    init_logging(args.debug);

    let options = ClientOptions::from_env();
    if options.credentials.is_none() {
        bail!("set DEEPGRAM_API_KEY or DEEPGRAM_ACCESS_TOKEN");
    }

    let audio = tokio::fs::read(&args.path)
        .await
        .with_context(|| format!("reading {}", args.path.display()))?;

    let client = LiveClient::builder()
        .options(options)
        .schema(
            LiveSchema::new()
                .model("nova-2")
                .punctuate(true)
                .interim_results(true),
        )
        .connect()?;

    let mut events = client.subscribe();

    client.wait_for_open(OPEN_TIMEOUT).await?;
    println!("Connected: {}", client.url());

    let sender = client.clone();
    let upload = tokio::spawn(async move {
        for chunk in audio.chunks(CHUNK_SIZE) {
            sender.send(chunk)?;
            tokio::time::sleep(CHUNK_INTERVAL).await;
        }
        sender.finish()
    });

    while let Some(event) = events.recv().await {
        match event {
            LiveEvent::Transcript(t) => {
                if let Some(text) = t.transcript().filter(|text| !text.is_empty()) {
                    let marker = if t.is_final { "final" } else { "interim" };
                    println!("[{marker}] {text}");
                }
            }
            LiveEvent::Metadata(m) => println!("Metadata: {:?}", m.request_id),
            LiveEvent::Warning(w) => eprintln!("Warning: {}", w.message),
            LiveEvent::Error(e) => eprintln!("Error: {}", e.message),
            LiveEvent::Close(close) => {
                println!("Closed ({}) {}", close.code, close.reason);
            }
            _ => {}
        }
    }

    upload.await??;
    Ok(())
}
