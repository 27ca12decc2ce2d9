//! Terminal rendering of playback events.

use indicatif::{ProgressBar, ProgressStyle};
use tokio::sync::mpsc;

use crate::playback::{PlaybackEvent, SessionEnd};
use crate::source::SourceError;

const BAR_TEMPLATE: &str = "{bar:30.cyan/blue} {pos}/{len} {msg}";

/// Prints events until the session ends. Returns `None` if the player went
/// away without ending the session.
pub async fn render_session(
    mut events: mpsc::UnboundedReceiver<PlaybackEvent>,
    sentences: &[String],
) -> Option<SessionEnd> {
    let bar = ProgressBar::new(sentences.len() as u64);
    bar.set_style(
        ProgressStyle::with_template(BAR_TEMPLATE).unwrap_or_else(|_| ProgressStyle::default_bar()),
    );

    while let Some(event) = events.recv().await {
        match event {
            PlaybackEvent::Progress { index, total, .. } => {
                bar.set_length(total as u64);
                bar.set_position(index as u64);
                if let Some(sentence) = sentences.get(index) {
                    bar.println(format!("  {}", sentence));
                }
            }
            PlaybackEvent::Status { message, .. } => bar.set_message(message),
            PlaybackEvent::SessionEnded { reason } => {
                bar.finish();
                return Some(reason);
            }
        }
    }

    bar.abandon();
    None
}

/// Status line shown when a topic cannot be turned into sentences
pub fn source_failure_message(error: &SourceError) -> &'static str {
    match error {
        SourceError::EmptyTopic => "Enter a topic!",
        SourceError::NotFound => "Topic not found.",
        SourceError::EmptyContent => "The article has nothing to read.",
        SourceError::Connection(_) => "Connection error.",
    }
}
