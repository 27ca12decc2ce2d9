//! Sentence-sequencing state machine.
//!
//! The controller never performs I/O. Each transition returns the
//! [`Effect`]s its driver must carry out, and the driver reports back via
//! [`PlaybackController::on_narration_finished`] and
//! [`PlaybackController::on_timer_fired`], tagged with the session they were
//! issued for.

use std::time::Duration;

use super::{PlaybackError, PlaybackObserver, SessionEnd, SessionId, Status};
use crate::engine::NarrationError;
use crate::state::{PlaybackSettings, PlayerStatus};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Narrate `text`, then report through `on_narration_finished`.
    Speak {
        session: SessionId,
        index: usize,
        text: String,
    },
    /// Sleep for `delay`, then report through `on_timer_fired`.
    ArmTimer { session: SessionId, delay: Duration },
    CancelTimer,
    Interrupt,
}

struct Session {
    id: SessionId,
    sentences: Vec<String>,
    cursor: usize,
}

enum Step {
    Speak { index: usize, total: usize, text: String },
    Finish,
}

pub struct PlaybackController<O> {
    settings: PlaybackSettings,
    observer: O,
    state: PlayerStatus,
    session: Option<Session>,
    next_session: u64,
    timer_armed: bool,
}

impl<O: PlaybackObserver> PlaybackController<O> {
    pub fn new(settings: PlaybackSettings, observer: O) -> Self {
        Self {
            settings,
            observer,
            state: PlayerStatus::Idle,
            session: None,
            next_session: 1,
            timer_armed: false,
        }
    }

    pub fn state(&self) -> PlayerStatus {
        self.state
    }

    /// Next index to narrate in the active session
    pub fn cursor(&self) -> Option<usize> {
        self.session.as_ref().map(|s| s.cursor)
    }

    pub fn session_id(&self) -> Option<SessionId> {
        self.session.as_ref().map(|s| s.id)
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    /// Begins a new session, superseding any active one.
    ///
    /// An empty sequence is rejected and leaves an active session running.
    pub fn start(&mut self, sentences: Vec<String>) -> Result<(SessionId, Vec<Effect>), PlaybackError> {
        if sentences.is_empty() {
            if self.state == PlayerStatus::Stopped {
                self.state = PlayerStatus::Idle;
            }
            tracing::warn!("Refusing to start playback: no sentences");
            return Err(PlaybackError::EmptySequence);
        }

        let mut effects = self.teardown();
        if !effects.is_empty() {
            tracing::info!("Superseding active session");
        }

        let id = SessionId(self.next_session);
        self.next_session += 1;
        tracing::info!("Session {} started with {} sentences", id.0, sentences.len());

        self.session = Some(Session {
            id,
            sentences,
            cursor: 0,
        });
        self.state = PlayerStatus::Playing;
        self.begin_step(&mut effects);

        Ok((id, effects))
    }

    pub fn on_narration_finished(
        &mut self,
        session: SessionId,
        index: usize,
        outcome: Result<(), NarrationError>,
    ) -> Vec<Effect> {
        let current = self
            .session
            .as_ref()
            .is_some_and(|s| s.id == session && s.cursor == index);
        if self.state != PlayerStatus::Playing || !current {
            tracing::debug!("Ignoring stale narration completion (session {}, index {})", session.0, index);
            return Vec::new();
        }

        if let Err(e) = outcome {
            tracing::warn!("Narration of sentence {} failed: {}", index + 1, e);
            self.observer.on_status(&Status::NarrationFailed {
                index,
                reason: e.to_string(),
            });
        }

        let mut effects = Vec::new();
        let min_chars = self.settings.min_fragment_chars;
        let done = match self.session.as_mut() {
            Some(s) => {
                s.cursor += 1;
                !s.sentences[s.cursor..].iter().any(|t| speakable(t, min_chars))
            }
            None => return effects,
        };

        if done {
            // reports any trailing short fragments as skipped, then finishes
            self.begin_step(&mut effects);
        } else {
            self.state = PlayerStatus::WaitingBetween;
            self.timer_armed = true;
            let delay = self.settings.delay();
            self.observer.on_status(&Status::Waiting {
                delay_ms: self.settings.delay_ms,
            });
            effects.push(Effect::ArmTimer { session, delay });
        }
        effects
    }

    pub fn on_timer_fired(&mut self, session: SessionId) -> Vec<Effect> {
        if self.state != PlayerStatus::WaitingBetween || self.session_id() != Some(session) {
            tracing::debug!("Ignoring stale timer (session {})", session.0);
            return Vec::new();
        }

        self.timer_armed = false;
        self.state = PlayerStatus::Playing;
        let mut effects = Vec::new();
        self.begin_step(&mut effects);
        effects
    }

    /// Ends the active session. A no-op when nothing is playing.
    pub fn stop(&mut self) -> Vec<Effect> {
        if !matches!(self.state, PlayerStatus::Playing | PlayerStatus::WaitingBetween) {
            return Vec::new();
        }

        let effects = self.teardown();
        self.state = PlayerStatus::Stopped;
        tracing::info!("Playback stopped");
        self.observer.on_status(&Status::Stopped);
        self.observer.on_session_end(SessionEnd::Stopped);
        effects
    }

    /// Stops whatever is running and returns to `Idle`.
    pub fn reset(&mut self) -> Vec<Effect> {
        let effects = self.stop();
        self.state = PlayerStatus::Idle;
        effects
    }

    /// Cancels the pending timer and in-flight narration, drops the session.
    fn teardown(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        if self.timer_armed {
            self.timer_armed = false;
            effects.push(Effect::CancelTimer);
        }
        if self.session.take().is_some() {
            effects.push(Effect::Interrupt);
        }
        effects
    }

    fn begin_step(&mut self, effects: &mut Vec<Effect>) {
        let min_chars = self.settings.min_fragment_chars;
        let step = {
            let Some(session) = self.session.as_mut() else {
                return;
            };
            let total = session.sentences.len();
            while session.cursor < total && !speakable(&session.sentences[session.cursor], min_chars) {
                tracing::debug!("Skipping short fragment {}", session.cursor + 1);
                self.observer.on_status(&Status::Skipped {
                    index: session.cursor,
                });
                session.cursor += 1;
            }

            if session.cursor >= total {
                Step::Finish
            } else {
                Step::Speak {
                    index: session.cursor,
                    total,
                    text: session.sentences[session.cursor].clone(),
                }
            }
        };

        match step {
            Step::Finish => self.finish(),
            Step::Speak { index, total, text } => {
                let Some(session) = self.session_id() else {
                    return;
                };
                self.observer.on_progress(index, total);
                self.observer.on_status(&Status::Speaking { index, total });
                effects.push(Effect::Speak {
                    session,
                    index,
                    text,
                });
            }
        }
    }

    fn finish(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        let total = session.sentences.len();
        self.state = PlayerStatus::Stopped;
        tracing::info!("Session {} finished", session.id.0);
        self.observer.on_progress(total, total);
        self.observer.on_status(&Status::Finished);
        self.observer.on_session_end(SessionEnd::Finished);
    }
}

fn speakable(text: &str, min_chars: usize) -> bool {
    text.trim().chars().count() >= min_chars
}
