//! Pause, resume and quit controls for a running crawl
//!
//! The crawl loop owns a [`CrawlControl`]; anything that wants to steer it
//! (the stdin listener, a Ctrl-C handler, a test) holds a cloned
//! [`ControlHandle`]. State travels over a `tokio::sync::watch` channel so a
//! paused loop sleeps until the state changes instead of spinning.

mod input;

pub use input::{spawn_stdin_listener, ControlCommand};

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

/// The two operator flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControlState {
    /// Toggled by pause/resume
    pub paused: bool,
    /// One-way latch; once set it stays set
    pub quit: bool,
}

/// What the crawl loop should do after consulting the controls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Proceed,
    Quit,
}

/// Cloneable sender side of the controls
#[derive(Debug, Clone)]
pub struct ControlHandle {
    tx: Arc<watch::Sender<ControlState>>,
}

impl ControlHandle {
    /// Flips the paused flag and returns the new value
    pub fn toggle_pause(&self) -> bool {
        let mut paused = false;
        self.tx.send_modify(|state| {
            state.paused = !state.paused;
            paused = state.paused;
        });

        if paused {
            tracing::info!("Crawl paused; enter the pause command again to resume");
        } else {
            tracing::info!("Crawl resumed");
        }
        paused
    }

    /// Requests a clean stop at the next iteration boundary
    pub fn request_quit(&self) {
        let mut first = false;
        self.tx.send_modify(|state| {
            first = !state.quit;
            state.quit = true;
        });

        if first {
            tracing::info!("Quit requested; stopping after the current page");
        }
    }

    /// Applies a parsed control command
    pub fn apply(&self, command: ControlCommand) {
        match command {
            ControlCommand::TogglePause => {
                self.toggle_pause();
            }
            ControlCommand::Quit => self.request_quit(),
        }
    }

    /// Returns the current flags
    pub fn state(&self) -> ControlState {
        *self.tx.borrow()
    }
}

/// Receiver side of the controls, owned by the crawl loop
///
/// It keeps a sender of its own, so closing every external handle (for example
/// when stdin reaches EOF) never leaves the loop waiting on a dead channel.
#[derive(Debug)]
pub struct CrawlControl {
    handle: ControlHandle,
    rx: watch::Receiver<ControlState>,
    poll_interval: Duration,
}

impl CrawlControl {
    /// Creates controls in the running state
    ///
    /// `poll_interval` bounds each wait while paused.
    pub fn new(poll_interval: Duration) -> Self {
        let (tx, rx) = watch::channel(ControlState::default());
        Self {
            handle: ControlHandle { tx: Arc::new(tx) },
            rx,
            poll_interval,
        }
    }

    /// Returns a handle that can steer this crawl
    pub fn handle(&self) -> ControlHandle {
        self.handle.clone()
    }

    pub fn state(&self) -> ControlState {
        *self.rx.borrow()
    }

    pub fn quit_requested(&self) -> bool {
        self.state().quit
    }

    /// Waits until the crawl may proceed
    ///
    /// Returns immediately when running. While paused, sleeps on the channel
    /// for at most the poll interval at a time and re-checks the flags, so a
    /// quit request is noticed promptly either way.
    pub async fn wait_until_runnable(&mut self) -> Gate {
        let mut announced = false;

        loop {
            let state = *self.rx.borrow_and_update();

            if state.quit {
                return Gate::Quit;
            }
            if !state.paused {
                return Gate::Proceed;
            }

            if !announced {
                tracing::debug!("Crawl loop waiting while paused");
                announced = true;
            }

            // Both a change notification and a timeout lead back to re-reading
            // the flags. The channel cannot close while `self.handle` is alive.
            let _ = tokio::time::timeout(self.poll_interval, self.rx.changed()).await;
        }
    }
}
