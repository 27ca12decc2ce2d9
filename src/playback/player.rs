use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;

use super::{Effect, PlaybackController, PlaybackError, PlaybackObserver, SessionId};
use crate::engine::{NarrationError, Narrator};
use crate::state::{PlaybackSettings, PlayerStatus};

enum Command {
    Start {
        sentences: Vec<String>,
        reply: oneshot::Sender<Result<SessionId, PlaybackError>>,
    },
    Stop {
        reply: oneshot::Sender<()>,
    },
    Shutdown,
}

/// Asynchronous completions, tagged with the session they belong to
enum Completion {
    NarrationFinished {
        session: SessionId,
        index: usize,
        outcome: Result<(), NarrationError>,
    },
    TimerFired {
        session: SessionId,
    },
}

/// Handle to the task that owns a [`PlaybackController`] and performs its
/// effects against a [`Narrator`] and the tokio timer.
pub struct Player {
    commands: mpsc::UnboundedSender<Command>,
    status: watch::Receiver<PlayerStatus>,
    task: JoinHandle<()>,
}

impl Player {
    pub fn spawn<O>(settings: PlaybackSettings, narrator: Arc<dyn Narrator>, observer: O) -> Self
    where
        O: PlaybackObserver + 'static,
    {
        let (commands, commands_rx) = mpsc::unbounded_channel();
        let (completions, completions_rx) = mpsc::unbounded_channel();
        let (status_tx, status) = watch::channel(PlayerStatus::Idle);

        tracing::debug!("Spawning player with narrator '{}'", narrator.name());
        let driver = Driver {
            controller: PlaybackController::new(settings, observer),
            narrator,
            completions,
            speech: None,
            timer: None,
            status: status_tx,
        };
        let task = tokio::spawn(driver.run(commands_rx, completions_rx));

        Self {
            commands,
            status,
            task,
        }
    }

    /// Starts a new session, superseding the current one.
    pub async fn start(&self, sentences: Vec<String>) -> Result<SessionId, PlaybackError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Start { sentences, reply })
            .map_err(|_| PlaybackError::PlayerClosed)?;
        rx.await.map_err(|_| PlaybackError::PlayerClosed)?
    }

    pub async fn stop(&self) -> Result<(), PlaybackError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Stop { reply })
            .map_err(|_| PlaybackError::PlayerClosed)?;
        rx.await.map_err(|_| PlaybackError::PlayerClosed)
    }

    pub fn status(&self) -> PlayerStatus {
        *self.status.borrow()
    }

    /// Stops playback and waits for the player task to exit.
    pub async fn shutdown(self) {
        let _ = self.commands.send(Command::Shutdown);
        if let Err(e) = self.task.await {
            tracing::error!("Player task ended abnormally: {}", e);
        }
    }
}

struct Driver<O> {
    controller: PlaybackController<O>,
    narrator: Arc<dyn Narrator>,
    completions: mpsc::UnboundedSender<Completion>,
    /// In-flight narration; aborting it drops the speech process.
    speech: Option<JoinHandle<()>>,
    timer: Option<JoinHandle<()>>,
    status: watch::Sender<PlayerStatus>,
}

impl<O: PlaybackObserver> Driver<O> {
    async fn run(
        mut self,
        mut commands: mpsc::UnboundedReceiver<Command>,
        mut completions: mpsc::UnboundedReceiver<Completion>,
    ) {
        loop {
            tokio::select! {
                command = commands.recv() => match command {
                    Some(Command::Start { sentences, reply }) => {
                        let result = match self.controller.start(sentences) {
                            Ok((session, effects)) => {
                                self.apply(effects);
                                Ok(session)
                            }
                            Err(e) => Err(e),
                        };
                        let _ = reply.send(result);
                    }
                    Some(Command::Stop { reply }) => {
                        let effects = self.controller.stop();
                        self.apply(effects);
                        let _ = reply.send(());
                    }
                    Some(Command::Shutdown) | None => {
                        let effects = self.controller.reset();
                        self.apply(effects);
                        break;
                    }
                },
                Some(completion) = completions.recv() => {
                    let effects = match completion {
                        Completion::NarrationFinished { session, index, outcome } => {
                            self.controller.on_narration_finished(session, index, outcome)
                        }
                        Completion::TimerFired { session } => self.controller.on_timer_fired(session),
                    };
                    self.apply(effects);
                }
            }
            self.status.send_replace(self.controller.state());
        }
        self.status.send_replace(self.controller.state());
        tracing::debug!("Player task exiting");
    }

    fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Speak { session, index, text } => {
                    self.cancel_speech();
                    let narrator = Arc::clone(&self.narrator);
                    let completions = self.completions.clone();
                    self.speech = Some(tokio::spawn(async move {
                        let outcome = narrator.speak(&text).await;
                        let _ = completions.send(Completion::NarrationFinished {
                            session,
                            index,
                            outcome,
                        });
                    }));
                }
                Effect::ArmTimer { session, delay } => {
                    self.cancel_timer();
                    let completions = self.completions.clone();
                    self.timer = Some(tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        let _ = completions.send(Completion::TimerFired { session });
                    }));
                }
                Effect::CancelTimer => self.cancel_timer(),
                Effect::Interrupt => {
                    self.cancel_speech();
                    self.narrator.interrupt();
                }
            }
        }
    }

    fn cancel_speech(&mut self) {
        if let Some(speech) = self.speech.take() {
            speech.abort();
        }
    }

    fn cancel_timer(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;
    use async_trait::async_trait;
    use tokio::time::Instant;

    use crate::playback::{EventSink, PlaybackEvent, SessionEnd};

    const SPEAK_TIME: Duration = Duration::from_millis(800);
    const DELAY: Duration = Duration::from_millis(1000);

    /// Takes SPEAK_TIME per utterance and fails on texts containing "FAIL".
    struct ScriptedNarrator {
        spoken: Mutex<Vec<(String, Instant)>>,
        completed: Mutex<Vec<String>>,
        interrupts: watch::Sender<u64>,
    }

    impl ScriptedNarrator {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                spoken: Mutex::new(Vec::new()),
                completed: Mutex::new(Vec::new()),
                interrupts: watch::channel(0).0,
            })
        }

        fn texts(&self) -> Vec<String> {
            self.spoken.lock().unwrap().iter().map(|(t, _)| t.clone()).collect()
        }

        fn completed(&self) -> Vec<String> {
            self.completed.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Narrator for ScriptedNarrator {
        async fn speak(&self, text: &str) -> Result<(), NarrationError> {
            self.spoken.lock().unwrap().push((text.to_string(), Instant::now()));
            if text.contains("FAIL") {
                return Err(NarrationError::Failed("scripted".into()));
            }
            let mut interrupted = self.interrupts.subscribe();
            tokio::select! {
                _ = tokio::time::sleep(SPEAK_TIME) => {
                    self.completed.lock().unwrap().push(text.to_string());
                    Ok(())
                }
                _ = interrupted.changed() => Err(NarrationError::Interrupted),
            }
        }

        fn interrupt(&self) {
            self.interrupts.send_modify(|g| *g += 1);
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    fn settings() -> PlaybackSettings {
        PlaybackSettings {
            delay_ms: DELAY.as_millis() as u64,
            min_fragment_chars: 0,
        }
    }

    fn spawn(narrator: &Arc<ScriptedNarrator>) -> (Player, mpsc::UnboundedReceiver<PlaybackEvent>) {
        let (sink, events) = EventSink::channel();
        let player = Player::spawn(settings(), narrator.clone(), sink);
        (player, events)
    }

    fn sentences(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    /// Queues a start without waiting for the player to act on it.
    fn queue_start(player: &Player, items: &[&str]) -> oneshot::Receiver<Result<SessionId, PlaybackError>> {
        let (reply, rx) = oneshot::channel();
        player
            .commands
            .send(Command::Start {
                sentences: sentences(items),
                reply,
            })
            .unwrap();
        rx
    }

    fn narration_failures(events: &[PlaybackEvent]) -> usize {
        events
            .iter()
            .filter(|e| matches!(
                e,
                PlaybackEvent::Status { status: crate::playback::Status::NarrationFailed { .. }, .. }
            ))
            .count()
    }

    async fn until_session_end(events: &mut mpsc::UnboundedReceiver<PlaybackEvent>) -> (Vec<PlaybackEvent>, SessionEnd) {
        let mut seen = Vec::new();
        while let Some(event) = events.recv().await {
            if let PlaybackEvent::SessionEnded { reason } = event {
                return (seen, reason);
            }
            seen.push(event);
        }
        panic!("event stream closed before the session ended");
    }

    fn progress(events: &[PlaybackEvent]) -> Vec<(usize, usize)> {
        events
            .iter()
            .filter_map(|e| match e {
                PlaybackEvent::Progress { index, total, .. } => Some((*index, *total)),
                _ => None,
            })
            .collect()
    }

    #[tokio::test(start_paused = true)]
    async fn hello_world_waits_between_sentences() {
        let narrator = ScriptedNarrator::new();
        let (player, mut events) = spawn(&narrator);
        let began = Instant::now();

        player.start(sentences(&["Hello.", "World."])).await.unwrap();
        let (seen, reason) = until_session_end(&mut events).await;

        assert_eq!(reason, SessionEnd::Finished);
        assert_eq!(narrator.texts(), vec!["Hello.", "World."]);
        assert_eq!(progress(&seen), vec![(0, 2), (1, 2), (2, 2)]);

        let spoken = narrator.spoken.lock().unwrap().clone();
        assert!(spoken[0].1 - began < Duration::from_millis(50));
        assert!(spoken[1].1 - spoken[0].1 >= SPEAK_TIME + DELAY);

        assert_eq!(player.status(), PlayerStatus::Stopped);
        player.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn stop_ends_session_once_and_silences_it() {
        let narrator = ScriptedNarrator::new();
        let (player, mut events) = spawn(&narrator);

        player.start(sentences(&["one", "two", "three"])).await.unwrap();
        // inside the pause after "one"
        tokio::time::sleep(SPEAK_TIME + DELAY / 2).await;
        player.stop().await.unwrap();
        player.stop().await.unwrap();

        let (_, reason) = until_session_end(&mut events).await;
        assert_eq!(reason, SessionEnd::Stopped);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(narrator.texts(), vec!["one"]);
        while let Ok(event) = events.try_recv() {
            assert!(
                !matches!(event, PlaybackEvent::SessionEnded { .. } | PlaybackEvent::Progress { .. }),
                "unexpected event after stop: {:?}",
                event
            );
        }
        player.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn stop_mid_utterance_interrupts_narrator() {
        let narrator = ScriptedNarrator::new();
        let (player, mut events) = spawn(&narrator);

        player.start(sentences(&["one", "two"])).await.unwrap();
        tokio::time::sleep(SPEAK_TIME / 2).await;
        player.stop().await.unwrap();

        let (_, reason) = until_session_end(&mut events).await;
        assert_eq!(reason, SessionEnd::Stopped);
        assert_eq!(*narrator.interrupts.borrow(), 1);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(narrator.texts(), vec!["one"]);
        assert_eq!(player.status(), PlayerStatus::Stopped);
        player.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn new_session_supersedes_old_one() {
        let narrator = ScriptedNarrator::new();
        let (player, mut events) = spawn(&narrator);

        let first = player.start(sentences(&["a1", "a2", "a3"])).await.unwrap();
        tokio::time::sleep(SPEAK_TIME + DELAY / 2).await;
        let second = player.start(sentences(&["b1", "b2"])).await.unwrap();
        assert_ne!(first, second);

        let (_, reason) = until_session_end(&mut events).await;
        assert_eq!(reason, SessionEnd::Finished);
        assert_eq!(narrator.texts(), vec!["a1", "b1", "b2"]);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(narrator.texts().len(), 3);
        player.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn empty_sequence_never_narrates() {
        let narrator = ScriptedNarrator::new();
        let (player, mut events) = spawn(&narrator);

        assert_eq!(player.start(Vec::new()).await, Err(PlaybackError::EmptySequence));
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert!(narrator.texts().is_empty());
        assert!(events.try_recv().is_err());
        assert_eq!(player.status(), PlayerStatus::Idle);
        player.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn failed_sentence_does_not_abort_session() {
        let narrator = ScriptedNarrator::new();
        let (player, mut events) = spawn(&narrator);

        player.start(sentences(&["ok", "FAIL here", "still ok"])).await.unwrap();
        let (seen, reason) = until_session_end(&mut events).await;

        assert_eq!(reason, SessionEnd::Finished);
        assert_eq!(narrator.texts(), vec!["ok", "FAIL here", "still ok"]);
        assert!(seen.iter().any(|e| matches!(
            e,
            PlaybackEvent::Status { status: crate::playback::Status::NarrationFailed { index: 1, .. }, .. }
        )));
        player.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn stop_right_after_start_stays_silent() {
        let narrator = ScriptedNarrator::new();
        let (player, mut events) = spawn(&narrator);

        let started = queue_start(&player, &["one", "two"]);
        let (reply, stopped) = oneshot::channel();
        player.commands.send(Command::Stop { reply }).unwrap();
        started.await.unwrap().unwrap();
        stopped.await.unwrap();

        let (seen, reason) = until_session_end(&mut events).await;
        assert_eq!(reason, SessionEnd::Stopped);
        assert_eq!(narration_failures(&seen), 0);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(narrator.completed().is_empty(), "spoke after stop: {:?}", narrator.completed());
        assert_eq!(player.status(), PlayerStatus::Stopped);
        player.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn back_to_back_starts_only_play_the_newest() {
        let narrator = ScriptedNarrator::new();
        let (player, mut events) = spawn(&narrator);

        let first = queue_start(&player, &["a1", "a2"]);
        let second = queue_start(&player, &["b1", "b2"]);
        let first = first.await.unwrap().unwrap();
        let second = second.await.unwrap().unwrap();
        assert_ne!(first, second);

        let (seen, reason) = until_session_end(&mut events).await;
        assert_eq!(reason, SessionEnd::Finished);
        assert_eq!(narration_failures(&seen), 0);

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert_eq!(narrator.completed(), vec!["b1", "b2"]);
        player.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn commands_fail_after_shutdown() {
        let narrator = ScriptedNarrator::new();
        let (player, _events) = spawn(&narrator);
        let handle = Player {
            commands: player.commands.clone(),
            status: player.status.clone(),
            task: tokio::spawn(async {}),
        };
        player.shutdown().await;

        assert_eq!(
            handle.start(sentences(&["late"])).await,
            Err(PlaybackError::PlayerClosed)
        );
        assert_eq!(handle.stop().await, Err(PlaybackError::PlayerClosed));
        assert!(narrator.texts().is_empty());
    }
}
