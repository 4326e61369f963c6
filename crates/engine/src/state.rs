//! Session flags shared between the caller and the decode thread.

use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, MutexGuard};

/// Externally visible playback state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaybackState {
    /// No session.
    Idle,
    Playing,
    Paused,
    /// The decode thread is leaving its loop and releasing resources.
    Stopping,
}

impl PlaybackState {
    /// Returns a short label for display.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Playing => "Playing",
            Self::Paused => "Paused",
            Self::Stopping => "Stopping",
        }
    }

    /// Whether a session is active, i.e. `start` would be ignored.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Playing | Self::Paused)
    }
}

#[derive(Debug, Default)]
pub(crate) struct SessionFlags {
    pub playing: bool,
    pub paused: bool,
    pub stopping: bool,
    pub path: Option<String>,
}

impl SessionFlags {
    pub fn state(&self) -> PlaybackState {
        if self.stopping {
            PlaybackState::Stopping
        } else if !self.playing {
            PlaybackState::Idle
        } else if self.paused {
            PlaybackState::Paused
        } else {
            PlaybackState::Playing
        }
    }
}

/// What the loop should do next, sampled once per iteration.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Intent {
    Run,
    Pause,
    Stop,
}

/// Flags plus the condition variable that wakes a waiting decode thread.
#[derive(Default)]
pub(crate) struct SharedState {
    flags: Mutex<SessionFlags>,
    wake: Condvar,
}

impl SharedState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lock(&self) -> MutexGuard<'_, SessionFlags> {
        self.flags.lock()
    }

    /// Wake the decode thread if it is waiting.
    pub fn notify(&self) {
        self.wake.notify_all();
    }

    pub fn state(&self) -> PlaybackState {
        self.flags.lock().state()
    }

    pub fn intent(&self) -> Intent {
        let flags = self.flags.lock();
        if !flags.playing {
            Intent::Stop
        } else if flags.paused {
            Intent::Pause
        } else {
            Intent::Run
        }
    }

    /// Block for at most one `slice` while paused. Returns early on resume
    /// or stop.
    pub fn wait_while_paused(&self, slice: Duration) {
        let mut flags = self.flags.lock();
        if flags.playing && flags.paused {
            self.wake.wait_for(&mut flags, slice);
        }
    }

    /// Sleep for `duration` unless a stop arrives first.
    pub fn sleep_unless_stopped(&self, duration: Duration) {
        let deadline = Instant::now() + duration;
        let mut flags = self.flags.lock();
        while flags.playing {
            if self.wake.wait_until(&mut flags, deadline).timed_out() {
                break;
            }
        }
    }

    /// Called by the decode thread when it leaves its loop on its own.
    pub fn begin_teardown(&self) {
        let mut flags = self.flags.lock();
        flags.playing = false;
        flags.stopping = true;
    }

    /// Clear every session field.
    pub fn reset(&self) {
        let mut flags = self.flags.lock();
        *flags = SessionFlags::default();
    }
}
