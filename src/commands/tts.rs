use std::sync::Arc;
use anyhow::{Context, Result};

use super::console;
use crate::engine::{self, Narrator};
use crate::playback::{EventSink, Player, SessionEnd};
use crate::source::{self, wikipedia::WikipediaSource, TextSource};
use crate::state::{PlaybackSettings, Settings};

/// Looks up `topic` and reads the summary sentence by sentence.
pub async fn read_topic(settings: &Settings, topic: &str) -> Result<SessionEnd> {
    let source = WikipediaSource::new(settings.voice.locale, &settings.source)?;
    println!("Searching for \"{}\"...", topic.trim());

    let sentences = match source.fetch(topic).await {
        Ok(sentences) => sentences,
        Err(e) => {
            println!("{}", console::source_failure_message(&e));
            return Err(e).with_context(|| format!("Could not load topic '{}'", topic.trim()));
        }
    };

    let narrator: Arc<dyn Narrator> = Arc::from(engine::create_narrator(&settings.voice));
    play(settings.playback.clone(), narrator, sentences).await
}

/// Speaks typed-in text as a single-sentence session.
pub async fn speak_text(settings: &Settings, text: &str) -> Result<SessionEnd> {
    let sentences = source::manual_sequence(text).context("Nothing to say")?;

    // typed text is never filtered as too short
    let playback = PlaybackSettings {
        min_fragment_chars: 0,
        ..settings.playback.clone()
    };
    let narrator: Arc<dyn Narrator> = Arc::from(engine::create_narrator(&settings.voice));
    play(playback, narrator, sentences).await
}

/// Runs one session to its end, stopping it on Ctrl-C.
pub async fn play(
    playback: PlaybackSettings,
    narrator: Arc<dyn Narrator>,
    sentences: Vec<String>,
) -> Result<SessionEnd> {
    let (sink, events) = EventSink::channel();
    let player = Player::spawn(playback, narrator, sink);
    player.start(sentences.clone()).await?;

    let render = console::render_session(events, &sentences);
    tokio::pin!(render);

    let end = loop {
        tokio::select! {
            end = &mut render => break end,
            signal = tokio::signal::ctrl_c() => {
                signal.context("Failed to listen for Ctrl-C")?;
                tracing::info!("Interrupted, stopping playback");
                player.stop().await?;
            }
        }
    };

    player.shutdown().await;
    end.ok_or_else(|| anyhow::anyhow!("Player exited before the session ended"))
}
