//! Native Player
//!
//! Headless front end for the playback engine: plays one file into an
//! in-memory surface at a fixed cadence and takes pause/resume/stop
//! commands on stdin.

mod commands;
mod snapshot;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::Parser;
use crossbeam::channel::{RecvTimeoutError, TryRecvError};
use np_engine::ffmpeg::FfmpegBackend;
use np_engine::{
    MemorySurface, PlaybackConfig, PlaybackController, PlaybackEvent, SessionEnd, Surface,
};
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use crate::commands::Command;
use crate::snapshot::SnapshotSurface;

const EVENT_POLL: Duration = Duration::from_millis(50);

/// Native Player - decode a video file and present it to a memory surface
#[derive(Parser, Debug)]
#[command(name = "native-player")]
#[command(about = "Play a video file through the native playback engine")]
#[command(version)]
struct Args {
    /// Media file to play
    path: PathBuf,

    /// JSON playback configuration
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the pause between presented frames
    #[arg(long)]
    frame_interval_ms: Option<u64>,

    /// Extra bytes per surface row
    #[arg(long, default_value = "0")]
    row_padding: usize,

    /// Write the last presented frame to this JPEG file
    #[arg(long)]
    snapshot: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

/// `RUST_LOG` wins over `--log-level` when set.
fn init_logging(log_level: &str) {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_lowercase()));

    FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

fn load_config(args: &Args) -> Result<PlaybackConfig> {
    let mut config = match &args.config {
        Some(path) => PlaybackConfig::from_file(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => PlaybackConfig::default(),
    };
    if let Some(ms) = args.frame_interval_ms {
        config = config.with_frame_interval(Duration::from_millis(ms));
    }
    Ok(config)
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    let config = load_config(&args)?;
    debug!(?config, "Playback configuration");

    let controller = PlaybackController::new(FfmpegBackend::new(), config);
    controller.init().context("FFmpeg initialization failed")?;

    let surface: Box<dyn Surface> = match &args.snapshot {
        Some(path) => Box::new(SnapshotSurface::new(args.row_padding, path)),
        None => Box::new(MemorySurface::with_row_padding(args.row_padding)),
    };

    let events = controller.events();
    controller.start(&args.path, surface)?;

    let mut commands = Some(commands::spawn_reader().context("Failed to read stdin")?);

    let end = loop {
        if let Some(rx) = &commands {
            match rx.try_recv() {
                Ok(Command::Pause) => controller.pause(),
                Ok(Command::Resume) => controller.resume(),
                Ok(Command::Stop) => controller.stop(),
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Disconnected) => commands = None,
            }
        }

        match events.recv_timeout(EVENT_POLL) {
            Ok(PlaybackEvent::Ended { end, stats }) => {
                info!(
                    packets = stats.packets_read,
                    decoded = stats.frames_decoded,
                    presented = stats.frames_presented,
                    dropped = stats.frames_dropped,
                    decode_errors = stats.decode_errors,
                    "Session ended: {:?}",
                    end
                );
                break end;
            }
            Ok(PlaybackEvent::Configured { geometry }) => info!("Playing at {}", geometry),
            Ok(PlaybackEvent::FrameDropped { index }) => warn!("Frame {} dropped", index),
            Ok(event) => debug!(?event, "Playback event"),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                error!("Event channel closed");
                break SessionEnd::Stopped;
            }
        }
    };

    controller.stop();

    match end {
        SessionEnd::Failed(e) => bail!("Playback failed: {}", e),
        SessionEnd::ReadFailed(e) => {
            warn!("Playback ended early: {}", e);
            Ok(())
        }
        SessionEnd::Stopped | SessionEnd::EndOfStream => Ok(()),
    }
}
