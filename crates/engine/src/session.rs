//! One playback session: setup, the decode-render loop, and teardown.
//!
//! Runs entirely on the decode thread. [`Session`] owns every resource and
//! tears them down on drop, so an early return or a panic during setup or
//! playback still releases everything exactly once.

use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::backend::MediaBackend;
use crate::config::PlaybackConfig;
use crate::error::PlaybackError;
use crate::events::{EventSink, PlaybackEvent, SessionEnd, SessionStats};
use crate::pipeline::{FramePipeline, Step};
use crate::presenter::{Presented, Presenter};
use crate::state::{Intent, SharedState};
use crate::surface::Surface;

/// Everything the decode thread needs, moved in at `start`.
pub(crate) struct SessionContext<B: MediaBackend> {
    pub backend: Arc<B>,
    pub path: String,
    pub surface: Box<dyn Surface>,
    pub shared: Arc<SharedState>,
    pub config: PlaybackConfig,
    pub events: EventSink,
}

pub(crate) struct Session<B: MediaBackend> {
    pipeline: FramePipeline<B>,
    presenter: Presenter,
    presented: u64,
    dropped: u64,
    torn_down: bool,
}

impl<B: MediaBackend> Session<B> {
    fn new(surface: Box<dyn Surface>, config: &PlaybackConfig) -> Self {
        Self {
            pipeline: FramePipeline::new(config.drain_on_end_of_stream),
            presenter: Presenter::new(surface),
            presented: 0,
            dropped: 0,
            torn_down: false,
        }
    }

    fn setup(&mut self, backend: &B, path: &str, events: &EventSink) -> Result<(), PlaybackError> {
        let geometry = self.pipeline.open(backend, path)?;
        self.presenter
            .configure(geometry)
            .map_err(|e| match e {
                PlaybackError::SurfaceSetup { .. } => e,
                other => PlaybackError::SurfaceSetup {
                    width: geometry.width,
                    height: geometry.height,
                    reason: other.to_string(),
                },
            })?;
        events.emit(PlaybackEvent::Configured { geometry });

        self.pipeline.allocate(backend)
    }

    /// The decode-render loop. Returns why it stopped.
    fn run(
        &mut self,
        shared: &SharedState,
        config: &PlaybackConfig,
        events: &EventSink,
    ) -> SessionEnd {
        let frame_interval = config.frame_interval();
        let pause_poll = config.pause_poll();

        loop {
            match shared.intent() {
                Intent::Stop => return SessionEnd::Stopped,
                Intent::Pause => {
                    shared.wait_while_paused(pause_poll);
                    continue;
                }
                Intent::Run => {}
            }

            match self.pipeline.step() {
                Ok(Step::Skipped) => {}
                Ok(Step::EndOfStream) => return SessionEnd::EndOfStream,
                Ok(Step::Converted) => {
                    let Some(frame) = self.pipeline.converted() else {
                        continue;
                    };
                    match self.presenter.present(frame) {
                        Ok(Presented::Shown) => {
                            self.presented += 1;
                            events.emit(PlaybackEvent::FramePresented {
                                index: self.presented,
                            });
                            shared.sleep_unless_stopped(frame_interval);
                        }
                        Ok(Presented::Dropped) => {
                            self.dropped += 1;
                            debug!(dropped = self.dropped, "Surface not ready, frame dropped");
                            events.emit(PlaybackEvent::FrameDropped {
                                index: self.presented + self.dropped,
                            });
                        }
                        Err(e) => {
                            self.dropped += 1;
                            warn!("Present failed: {}", e);
                            events.emit(PlaybackEvent::FrameDropped {
                                index: self.presented + self.dropped,
                            });
                        }
                    }
                }
                Err(e) if e.ends_session() => {
                    warn!("Stopping playback: {}", e);
                    return SessionEnd::ReadFailed(e);
                }
                Err(e) => {
                    warn!("Skipping frame: {}", e);
                }
            }
        }
    }

    fn stats(&self) -> SessionStats {
        SessionStats {
            frames_presented: self.presented,
            frames_dropped: self.dropped,
            ..self.pipeline.stats()
        }
    }

    /// Release surface resource, decode-side resources, then the surface
    /// handle. Idempotent.
    fn teardown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;

        self.presenter.release_surface();
        self.pipeline.teardown();
        self.presenter.release_handle();
    }
}

impl<B: MediaBackend> Drop for Session<B> {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Decode thread entry point.
pub(crate) fn run_session<B: MediaBackend>(ctx: SessionContext<B>) -> SessionEnd {
    let SessionContext {
        backend,
        path,
        surface,
        shared,
        config,
        events,
    } = ctx;

    info!("Decode thread started for '{}'", path);
    events.emit(PlaybackEvent::Started { path: path.clone() });

    let mut session = Session::<B>::new(surface, &config);
    let end = match session.setup(&backend, &path, &events) {
        Ok(()) => session.run(&shared, &config, &events),
        Err(e) => {
            error!("Failed to start playback of '{}': {}", path, e);
            SessionEnd::Failed(e)
        }
    };

    shared.begin_teardown();
    session.teardown();
    let stats = session.stats();
    drop(session);
    shared.reset();

    info!(
        presented = stats.frames_presented,
        dropped = stats.frames_dropped,
        packets = stats.packets_read,
        "Decode thread exited ({:?})",
        end
    );
    events.emit_final(PlaybackEvent::Ended {
        end: end.clone(),
        stats,
    });

    end
}
