pub mod system_tts;

use async_trait::async_trait;
use thiserror::Error;

use crate::state::{Locale, VoiceGender, VoiceSettings};

/// Per-utterance failure. Never fatal to a playback session.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NarrationError {
    #[error("narration interrupted")]
    Interrupted,

    #[error("speech synthesizer unavailable: {0}")]
    Unavailable(String),

    #[error("speech synthesis failed: {0}")]
    Failed(String),
}

/// Voice parameters handed to a narrator at construction
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceOptions {
    pub locale: Locale,
    pub gender: Option<VoiceGender>,
    pub speed: f32,
    pub voice_name: Option<String>,
}

impl From<&VoiceSettings> for VoiceOptions {
    fn from(settings: &VoiceSettings) -> Self {
        Self {
            locale: settings.locale,
            gender: settings.gender,
            speed: settings.speed,
            voice_name: settings.voice_name.clone(),
        }
    }
}

/// Text -> audible speech, one utterance at a time.
///
/// The future returned by `speak` resolving is the single completion signal
/// for that call: `Ok` when the utterance ended, `Err` when it failed or was
/// interrupted. Calling `speak` while another utterance is in flight
/// interrupts the earlier one.
#[async_trait]
pub trait Narrator: Send + Sync {
    async fn speak(&self, text: &str) -> Result<(), NarrationError>;

    /// Best-effort, idempotent, safe when nothing is speaking.
    fn interrupt(&self);

    fn name(&self) -> &str;
}

/// Factory for the narrator configured in settings
pub fn create_narrator(settings: &VoiceSettings) -> Box<dyn Narrator> {
    let program = settings.program.resolve();
    tracing::debug!("Using speech program {:?}", program);
    Box::new(system_tts::SystemNarrator::new(program, VoiceOptions::from(settings)))
}
