pub mod controller;
pub mod player;

use std::fmt;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::mpsc;

pub use controller::{Effect, PlaybackController};
pub use player::Player;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PlaybackError {
    #[error("nothing to narrate")]
    EmptySequence,

    #[error("player task is no longer running")]
    PlayerClosed,
}

/// Identifies one run from `start` to its end. Completions carry the id they
/// were issued under so the controller can drop ones from a superseded run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SessionId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEnd {
    Finished,
    Stopped,
}

/// Structured status codes; `Display` gives the human-readable line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Status {
    Speaking { index: usize, total: usize },
    Waiting { delay_ms: u64 },
    Skipped { index: usize },
    NarrationFailed { index: usize, reason: String },
    Finished,
    Stopped,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Speaking { index, total } => {
                write!(f, "Speaking sentence {} of {}...", index + 1, total)
            }
            Self::Waiting { delay_ms } => {
                write!(f, "Pausing {:.1}s...", *delay_ms as f64 / 1000.0)
            }
            Self::Skipped { index } => write!(f, "Skipping short fragment {}", index + 1),
            Self::NarrationFailed { index, reason } => {
                write!(f, "Could not speak sentence {}: {}", index + 1, reason)
            }
            Self::Finished => f.write_str("End of text."),
            Self::Stopped => f.write_str("Stopped."),
        }
    }
}

/// Host-side sink for what the controller reports.
pub trait PlaybackObserver: Send {
    /// Called before narrating `index` of `total`, and once with
    /// `index == total` when a session finishes.
    fn on_progress(&mut self, index: usize, total: usize);
    fn on_status(&mut self, status: &Status);
    fn on_session_end(&mut self, reason: SessionEnd);
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PlaybackEvent {
    Progress { index: usize, total: usize, fraction: f64 },
    Status { status: Status, message: String },
    SessionEnded { reason: SessionEnd },
}

/// Observer that forwards everything as [`PlaybackEvent`]s over a channel.
pub struct EventSink {
    tx: mpsc::UnboundedSender<PlaybackEvent>,
}

impl EventSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<PlaybackEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn emit(&self, event: PlaybackEvent) {
        // The host may have gone away; playback doesn't depend on it.
        let _ = self.tx.send(event);
    }
}

impl PlaybackObserver for EventSink {
    fn on_progress(&mut self, index: usize, total: usize) {
        let fraction = if total > 0 { index as f64 / total as f64 } else { 0.0 };
        self.emit(PlaybackEvent::Progress { index, total, fraction });
    }

    fn on_status(&mut self, status: &Status) {
        self.emit(PlaybackEvent::Status {
            status: status.clone(),
            message: status.to_string(),
        });
    }

    fn on_session_end(&mut self, reason: SessionEnd) {
        self.emit(PlaybackEvent::SessionEnded { reason });
    }
}
