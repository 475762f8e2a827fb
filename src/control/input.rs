//! Line-oriented operator input

use crate::control::ControlHandle;
use std::io::{self, BufRead};
use std::thread::{self, JoinHandle};

/// A recognized operator command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    /// Pause a running crawl or resume a paused one
    TogglePause,
    /// Stop at the next iteration boundary
    Quit,
}

impl ControlCommand {
    /// Parses one input line
    ///
    /// Matching is case-insensitive and ignores surrounding whitespace. Any
    /// other input returns None.
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim().to_ascii_lowercase().as_str() {
            "p" | "pause" | "resume" => Some(Self::TogglePause),
            "q" | "quit" | "exit" => Some(Self::Quit),
            _ => None,
        }
    }
}

/// Feeds every command read from `reader` into `handle`
///
/// Returns when the input ends or cannot be read; the crawl is not affected.
pub fn listen<R: BufRead>(reader: R, handle: ControlHandle) {
    let mut lines = reader.lines();

    loop {
        match lines.next() {
            Some(Ok(line)) => match ControlCommand::parse(&line) {
                Some(command) => handle.apply(command),
                None => {
                    if !line.trim().is_empty() {
                        tracing::debug!("Ignoring control input: {:?}", line.trim());
                    }
                }
            },
            None => {
                tracing::debug!("Control input closed");
                break;
            }
            Some(Err(e)) => {
                tracing::warn!("Control input failed: {}; ignoring further input", e);
                break;
            }
        }
    }
}

/// Spawns a thread that reads control commands from stdin
///
/// Reads block, so this runs on its own detached thread instead of the
/// runtime's blocking pool.
pub fn spawn_stdin_listener(handle: ControlHandle) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("control-input".to_string())
        .spawn(move || listen(io::stdin().lock(), handle))
}
