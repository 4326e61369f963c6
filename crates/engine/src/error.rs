//! Error types for the playback engine.

/// Errors raised while setting up or running a playback session.
///
/// Setup errors ([`is_fatal`](Self::is_fatal)) end the session before any
/// frame is presented. A packet read error ends the session the same way an
/// explicit stop does. Everything else is a per-frame failure: the frame is
/// skipped and the loop carries on.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlaybackError {
    #[error("failed to open media source '{path}': {reason}")]
    SourceOpen { path: String, reason: String },

    #[error("failed to probe streams: {0}")]
    StreamProbe(String),

    #[error("no video stream found")]
    NoVideoStream,

    #[error("failed to open decoder for stream {stream_index}: {reason}")]
    DecoderOpen { stream_index: usize, reason: String },

    #[error("failed to set up pixel converter: {0}")]
    ConverterSetup(String),

    #[error("failed to configure surface geometry {width}x{height}: {reason}")]
    SurfaceSetup {
        width: u32,
        height: u32,
        reason: String,
    },

    #[error("failed to read packet: {0}")]
    PacketRead(String),

    #[error("decode failed: {0}")]
    Decode(String),

    #[error("pixel conversion failed: {0}")]
    Convert(String),

    #[error("surface buffer unavailable")]
    SurfaceBufferUnavailable,

    #[error("invalid buffer layout: {0}")]
    BufferLayout(String),

    #[error("backend initialization failed: {0}")]
    Init(String),

    #[error("failed to spawn decode thread: {0}")]
    Spawn(String),
}

impl PlaybackError {
    /// Whether this error aborts session setup.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::SourceOpen { .. }
                | Self::StreamProbe(_)
                | Self::NoVideoStream
                | Self::DecoderOpen { .. }
                | Self::ConverterSetup(_)
                | Self::SurfaceSetup { .. }
        )
    }

    /// Whether a running session must end after this error.
    pub fn ends_session(&self) -> bool {
        matches!(self, Self::PacketRead(_))
    }
}
