//! Single-stream video playback engine.
//!
//! Architecture:
//!
//! ```text
//! Caller Thread                  Decode Thread ("decode-worker")
//! ┌──────────────────┐          ┌───────────────────────────────┐
//! │ start / pause    │── flags ─│ loop:                         │
//! │ resume / stop    │  (mutex, │   snapshot intent (locked)    │
//! │                  │  condvar)│   read packet → decode        │
//! │ events()  ◄──────│─ events ─│   convert → present → pace    │
//! └──────────────────┘          │ teardown (always, in order)   │
//!                               └───────────────────────────────┘
//! ```
//!
//! The caller owns a [`PlaybackController`]. Each `start` moves a
//! [`Surface`] into a freshly spawned decode thread which owns every session
//! resource (media source, decoder, converter, frame buffers, surface) until
//! teardown. `stop` joins that thread, so when it returns everything has been
//! released.
//!
//! Media access goes through the [`MediaBackend`] traits. With the `ffmpeg`
//! feature enabled, [`ffmpeg::FfmpegBackend`] implements them on top of
//! `ffmpeg-next`.

pub mod backend;
pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod frame;
pub mod surface;

mod pipeline;
mod presenter;
mod session;
mod state;

#[cfg(feature = "ffmpeg")]
pub mod ffmpeg;

#[cfg(test)]
mod testing;

pub use backend::{
    DecodeStatus, FrameConverter, MediaBackend, MediaKind, MediaSource, ReadOutcome, StreamInfo,
    VideoDecoder,
};
pub use config::{ConfigError, PlaybackConfig};
pub use controller::PlaybackController;
pub use error::PlaybackError;
pub use events::{PlaybackEvent, SessionEnd, SessionStats};
pub use frame::{copy_rows, Geometry, PixelFormat, RgbaFrame};
pub use state::PlaybackState;
pub use surface::{MemorySurface, Surface, SurfaceBuffer};
