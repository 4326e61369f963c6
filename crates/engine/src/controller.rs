//! Playback controller: the caller-facing command surface.
//!
//! State machine: `Idle → Playing → {Paused ⇄ Playing} → Stopping → Idle`.
//!
//! At most one session exists at a time. The session flags live behind one
//! mutex shared with the decode thread, which only samples them at iteration
//! boundaries. The worker's join handle sits behind a second mutex that
//! serializes `start` against `stop`; the decode thread never takes it.
//!
//! Commands are meant to come from a single caller thread. Concurrent
//! callers are serialized but get no ordering guarantees between them.

use std::path::Path;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;
use tracing::{debug, error, info};

use crate::backend::MediaBackend;
use crate::config::PlaybackConfig;
use crate::error::PlaybackError;
use crate::events::{EventSink, PlaybackEvent};
use crate::session::{run_session, SessionContext};
use crate::state::{PlaybackState, SharedState};
use crate::surface::Surface;

/// Owns the playback session and the decode thread running it.
pub struct PlaybackController<B: MediaBackend> {
    backend: Arc<B>,
    config: PlaybackConfig,
    shared: Arc<SharedState>,
    worker: Mutex<Option<JoinHandle<()>>>,
    events_tx: Sender<PlaybackEvent>,
    events_rx: Receiver<PlaybackEvent>,
}

impl<B: MediaBackend> PlaybackController<B> {
    /// Create an idle controller.
    pub fn new(backend: B, config: PlaybackConfig) -> Self {
        let (events_tx, events_rx) = channel::bounded(config.event_capacity.max(1));
        Self {
            backend: Arc::new(backend),
            config,
            shared: Arc::new(SharedState::new()),
            worker: Mutex::new(None),
            events_tx,
            events_rx,
        }
    }

    /// Process-wide one-time backend setup. Safe to call repeatedly.
    pub fn init(&self) -> Result<(), PlaybackError> {
        self.backend.init()
    }

    pub fn config(&self) -> &PlaybackConfig {
        &self.config
    }

    pub fn state(&self) -> PlaybackState {
        self.shared.state()
    }

    /// Source path of the active session.
    pub fn current_path(&self) -> Option<String> {
        self.shared.lock().path.clone()
    }

    /// Status events of all sessions run by this controller.
    ///
    /// Receivers share one queue: each event goes to a single receiver.
    pub fn events(&self) -> Receiver<PlaybackEvent> {
        self.events_rx.clone()
    }

    /// Begin playing `path` into `surface`.
    ///
    /// Ignored (returns `Ok`) while a session is playing or paused; the
    /// surface is then dropped untouched. Otherwise the surface moves into a
    /// new decode thread, which releases it at teardown. Setup failures are
    /// reported through [`PlaybackEvent::Ended`], not here.
    pub fn start(
        &self,
        path: impl AsRef<Path>,
        surface: Box<dyn Surface>,
    ) -> Result<(), PlaybackError> {
        let mut worker = self.worker.lock();

        if self.shared.state().is_active() {
            debug!("Playback already active, ignoring start");
            return Ok(());
        }

        // A previous session may still be tearing down after reaching the
        // end of its stream.
        if let Some(previous) = worker.take() {
            self.join(previous);
        }

        let path = self.config.clamp_path(&path.as_ref().to_string_lossy());
        {
            let mut flags = self.shared.lock();
            flags.playing = true;
            flags.paused = false;
            flags.stopping = false;
            flags.path = Some(path.clone());
        }

        let ctx = SessionContext {
            backend: Arc::clone(&self.backend),
            path: path.clone(),
            surface,
            shared: Arc::clone(&self.shared),
            config: self.config.clone(),
            events: EventSink::new(self.events_tx.clone())
                .with_overflow(self.events_rx.clone()),
        };

        let spawned = thread::Builder::new()
            .name("decode-worker".to_string())
            .spawn(move || {
                run_session(ctx);
            });

        match spawned {
            Ok(handle) => {
                *worker = Some(handle);
                info!("Playback started: {}", path);
                Ok(())
            }
            Err(e) => {
                self.shared.reset();
                error!("Failed to spawn decode thread: {}", e);
                Err(PlaybackError::Spawn(e.to_string()))
            }
        }
    }

    /// Pause at the next iteration boundary. Sets the flag even when idle.
    pub fn pause(&self) {
        self.shared.lock().paused = true;
        debug!("Playback paused");
    }

    /// Resume consuming packets.
    pub fn resume(&self) {
        self.shared.lock().paused = false;
        self.shared.notify();
        debug!("Playback resumed");
    }

    /// End the session and wait until its resources are released.
    ///
    /// No-op when nothing is playing. When this returns, the decode thread
    /// has exited.
    pub fn stop(&self) {
        let mut worker = self.worker.lock();

        let was_playing = {
            let mut flags = self.shared.lock();
            let was_playing = flags.playing;
            if was_playing {
                flags.playing = false;
                flags.stopping = true;
            }
            was_playing
        };

        if was_playing {
            info!("Stopping playback");
            self.shared.notify();
        }

        if let Some(handle) = worker.take() {
            self.join(handle);
        }
    }

    fn join(&self, handle: JoinHandle<()>) {
        if handle.join().is_err() {
            error!("Decode thread panicked");
        }
        // The thread normally clears the flags itself; after a panic it never
        // got there.
        self.shared.reset();
    }
}

impl<B: MediaBackend> Drop for PlaybackController<B> {
    fn drop(&mut self) {
        self.stop();
    }
}
