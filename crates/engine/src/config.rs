//! Playback tuning knobs.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Errors that can occur when loading a [`PlaybackConfig`] file.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Timing and sizing parameters for playback sessions.
///
/// Missing fields in a config file fall back to the defaults.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Length of one wait slice while paused, in milliseconds.
    pub pause_poll_ms: u64,
    /// Sleep after each presented frame, in milliseconds (~60 Hz by default).
    pub frame_interval_ms: u64,
    /// Longest accepted source path in bytes; longer paths are truncated.
    pub max_path_bytes: usize,
    /// Drain frames still buffered in the decoder once the source is exhausted.
    pub drain_on_end_of_stream: bool,
    /// Capacity of the status event channel.
    pub event_capacity: usize,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            pause_poll_ms: 100,
            frame_interval_ms: 16,
            max_path_bytes: 1023,
            drain_on_end_of_stream: true,
            event_capacity: 64,
        }
    }
}

impl PlaybackConfig {
    /// Parse a config from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a config from a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Set the per-frame pacing interval.
    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval_ms = interval.as_millis() as u64;
        self
    }

    /// Set the paused wait slice.
    pub fn with_pause_poll(mut self, slice: Duration) -> Self {
        self.pause_poll_ms = slice.as_millis() as u64;
        self
    }

    /// Enable or disable draining the decoder at end of stream.
    pub fn with_drain_on_end_of_stream(mut self, drain: bool) -> Self {
        self.drain_on_end_of_stream = drain;
        self
    }

    /// Paused wait slice. Never zero, so a paused loop always yields.
    pub fn pause_poll(&self) -> Duration {
        Duration::from_millis(self.pause_poll_ms.max(1))
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms)
    }

    /// Clamp `path` to `max_path_bytes`, cutting on a UTF-8 boundary.
    pub fn clamp_path(&self, path: &str) -> String {
        if path.len() <= self.max_path_bytes {
            return path.to_string();
        }

        let mut end = self.max_path_bytes;
        while !path.is_char_boundary(end) {
            end -= 1;
        }

        warn!(
            len = path.len(),
            max = self.max_path_bytes,
            "Source path too long, truncating"
        );
        path[..end].to_string()
    }
}
