//! Status events published by the decode thread.

use crossbeam::channel::{Receiver, Sender, TrySendError};
use tracing::trace;

use crate::error::PlaybackError;
use crate::frame::Geometry;

/// Why a session ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEnd {
    /// `stop()` was called.
    Stopped,
    /// The source ran out of packets.
    EndOfStream,
    /// A packet read failed mid-stream.
    ReadFailed(PlaybackError),
    /// Session setup failed; nothing was presented.
    Failed(PlaybackError),
}

/// Per-session counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionStats {
    pub packets_read: u64,
    pub frames_decoded: u64,
    pub frames_presented: u64,
    pub frames_dropped: u64,
    pub decode_errors: u64,
}

/// Notifications from a running session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PlaybackEvent {
    Started { path: String },
    /// The surface was configured to the decoder's geometry.
    Configured { geometry: Geometry },
    /// A frame became visible. `index` counts from 1 per session.
    FramePresented { index: u64 },
    /// A decoded frame could not be presented.
    FrameDropped { index: u64 },
    /// Teardown has completed.
    Ended { end: SessionEnd, stats: SessionStats },
}

/// Non-blocking publisher; a full channel discards the event.
#[derive(Clone)]
pub(crate) struct EventSink {
    tx: Sender<PlaybackEvent>,
    overflow: Option<Receiver<PlaybackEvent>>,
}

impl EventSink {
    pub(crate) fn new(tx: Sender<PlaybackEvent>) -> Self {
        Self { tx, overflow: None }
    }

    /// Let [`emit_final`](Self::emit_final) evict queued events through `rx`.
    pub(crate) fn with_overflow(mut self, rx: Receiver<PlaybackEvent>) -> Self {
        self.overflow = Some(rx);
        self
    }

    pub(crate) fn emit(&self, event: PlaybackEvent) {
        match self.tx.try_send(event) {
            Ok(()) => {}
            Err(TrySendError::Full(event)) => {
                trace!(?event, "Event channel full, discarding");
            }
            Err(TrySendError::Disconnected(_)) => {}
        }
    }

    /// Publish an event that must not be lost, dropping the oldest queued
    /// events to make room.
    pub(crate) fn emit_final(&self, mut event: PlaybackEvent) {
        loop {
            match self.tx.try_send(event) {
                Ok(()) | Err(TrySendError::Disconnected(_)) => return,
                Err(TrySendError::Full(rejected)) => {
                    let Some(rx) = &self.overflow else {
                        trace!(event = ?rejected, "Event channel full, discarding");
                        return;
                    };
                    if let Ok(evicted) = rx.try_recv() {
                        trace!(?evicted, "Evicted event to make room");
                    }
                    event = rejected;
                }
            }
        }
    }
}
