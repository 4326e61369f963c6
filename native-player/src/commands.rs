//! Playback commands read from stdin.

use std::io::{self, BufRead};
use std::thread;

use crossbeam::channel::{self, Receiver};
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Pause,
    Resume,
    Stop,
}

impl Command {
    /// Parse one input line. Blank lines yield `None`.
    pub fn parse(line: &str) -> Option<Result<Self, String>> {
        let word = line.trim();
        if word.is_empty() {
            return None;
        }
        Some(match word.to_lowercase().as_str() {
            "p" | "pause" => Ok(Command::Pause),
            "r" | "resume" => Ok(Command::Resume),
            "s" | "stop" | "q" | "quit" => Ok(Command::Stop),
            _ => Err(word.to_string()),
        })
    }
}

/// Read commands on a background thread. The channel disconnects at EOF.
pub fn spawn_reader() -> io::Result<Receiver<Command>> {
    let (tx, rx) = channel::unbounded();

    thread::Builder::new()
        .name("stdin-commands".to_string())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                match Command::parse(&line) {
                    Some(Ok(command)) => {
                        if tx.send(command).is_err() {
                            break;
                        }
                    }
                    Some(Err(unknown)) => {
                        warn!("Unknown command '{}' (use p, r or s)", unknown)
                    }
                    None => {}
                }
            }
            debug!("stdin closed");
        })?;

    Ok(rx)
}
