use std::process::Stdio;
use async_trait::async_trait;
use tokio::process::Command;
use tokio::sync::watch;

use super::{NarrationError, Narrator, VoiceOptions};
use crate::state::{SpeechProgram, VoiceGender};

/// Words per minute the speech programs use at speed 1.0
const BASE_WORDS_PER_MINUTE: f32 = 175.0;

/// Narrator backed by the platform speech command (`say`, `espeak-ng`, `spd-say`).
///
/// Each utterance is one child process. Interruption bumps a generation
/// counter; whichever `speak` call is waiting on a child kills it and resolves
/// with [`NarrationError::Interrupted`].
pub struct SystemNarrator {
    program: SpeechProgram,
    voice: VoiceOptions,
    interrupts: watch::Sender<u64>,
}

impl SystemNarrator {
    pub fn new(program: SpeechProgram, voice: VoiceOptions) -> Self {
        let (interrupts, _) = watch::channel(0);
        Self {
            program: program.resolve(),
            voice,
            interrupts,
        }
    }

    /// Program name and arguments used to speak `text`
    pub fn command_line(&self, text: &str) -> (&'static str, Vec<String>) {
        let mut args = Vec::new();
        let locale = self.voice.locale.code();

        let program = match self.program {
            SpeechProgram::Say | SpeechProgram::Auto => {
                args.push("-r".to_string());
                args.push(words_per_minute(self.voice.speed).to_string());
                if let Some(name) = &self.voice.voice_name {
                    args.push("-v".to_string());
                    args.push(name.clone());
                }
                "say"
            }
            SpeechProgram::EspeakNg => {
                let voice = match (&self.voice.voice_name, self.voice.gender) {
                    (Some(name), _) => name.clone(),
                    (None, Some(VoiceGender::Male)) => format!("{}+m3", locale),
                    (None, Some(VoiceGender::Female)) => format!("{}+f3", locale),
                    (None, None) => locale.to_string(),
                };
                args.push("-v".to_string());
                args.push(voice);
                args.push("-s".to_string());
                args.push(words_per_minute(self.voice.speed).to_string());
                "espeak-ng"
            }
            SpeechProgram::SpdSay => {
                // -w blocks until the message has been spoken
                args.push("-w".to_string());
                args.push("-l".to_string());
                args.push(locale.to_string());
                args.push("-r".to_string());
                args.push(dispatcher_rate(self.voice.speed).to_string());
                match self.voice.gender {
                    Some(VoiceGender::Male) => {
                        args.push("-t".to_string());
                        args.push("male1".to_string());
                    }
                    Some(VoiceGender::Female) => {
                        args.push("-t".to_string());
                        args.push("female1".to_string());
                    }
                    None => {}
                }
                if let Some(name) = &self.voice.voice_name {
                    args.push("-y".to_string());
                    args.push(name.clone());
                }
                "spd-say"
            }
        };

        args.push(text.to_string());
        (program, args)
    }
}

fn words_per_minute(speed: f32) -> u32 {
    (BASE_WORDS_PER_MINUTE * speed).round().clamp(80.0, 500.0) as u32
}

/// speech-dispatcher expresses rate as -100..=100 around its default
fn dispatcher_rate(speed: f32) -> i32 {
    ((speed - 1.0) * 100.0).round().clamp(-100.0, 100.0) as i32
}

#[async_trait]
impl Narrator for SystemNarrator {
    async fn speak(&self, text: &str) -> Result<(), NarrationError> {
        // interrupts raised before this point belong to earlier utterances
        let mut interrupted = self.interrupts.subscribe();

        let (program, args) = self.command_line(text);
        let mut child = Command::new(program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| NarrationError::Unavailable(format!("{}: {}", program, e)))?;

        tracing::debug!("Narration started via {} ({} chars)", program, text.chars().count());

        let status = tokio::select! {
            status = child.wait() => Some(status),
            _ = interrupted.changed() => None,
        };

        match status {
            Some(Ok(status)) if status.success() => Ok(()),
            Some(Ok(status)) => Err(NarrationError::Failed(format!(
                "{} exited with {}",
                program, status
            ))),
            Some(Err(e)) => Err(NarrationError::Failed(e.to_string())),
            None => {
                if let Err(e) = child.kill().await {
                    tracing::debug!("Speech process already gone: {}", e);
                }
                Err(NarrationError::Interrupted)
            }
        }
    }

    fn interrupt(&self) {
        self.interrupts.send_modify(|generation| *generation += 1);
    }

    fn name(&self) -> &str {
        match self.program {
            SpeechProgram::Say | SpeechProgram::Auto => "say",
            SpeechProgram::EspeakNg => "espeak-ng",
            SpeechProgram::SpdSay => "spd-say",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Locale;

    fn voice(gender: Option<VoiceGender>, speed: f32) -> VoiceOptions {
        VoiceOptions {
            locale: Locale::Pl,
            gender,
            speed,
            voice_name: None,
        }
    }

    #[test]
    fn espeak_picks_gendered_variant() {
        let narrator = SystemNarrator::new(SpeechProgram::EspeakNg, voice(Some(VoiceGender::Female), 1.0));
        let (program, args) = narrator.command_line("Dzień dobry.");
        assert_eq!(program, "espeak-ng");
        assert_eq!(args, vec!["-v", "pl+f3", "-s", "175", "Dzień dobry."]);
    }

    #[test]
    fn explicit_voice_name_wins() {
        let mut options = voice(Some(VoiceGender::Male), 1.0);
        options.voice_name = Some("Zosia".to_string());
        let narrator = SystemNarrator::new(SpeechProgram::Say, options);
        let (program, args) = narrator.command_line("Cześć");
        assert_eq!(program, "say");
        assert_eq!(args, vec!["-r", "175", "-v", "Zosia", "Cześć"]);
    }

    #[test]
    fn spd_say_waits_and_scales_rate() {
        let mut options = voice(Some(VoiceGender::Male), 1.5);
        options.locale = Locale::En;
        let narrator = SystemNarrator::new(SpeechProgram::SpdSay, options);
        let (program, args) = narrator.command_line("Hello.");
        assert_eq!(program, "spd-say");
        assert_eq!(
            args,
            vec!["-w", "-l", "en", "-r", "50", "-t", "male1", "Hello."]
        );
    }

    #[test]
    fn rates_are_clamped() {
        assert_eq!(words_per_minute(0.1), 80);
        assert_eq!(words_per_minute(10.0), 500);
        assert_eq!(dispatcher_rate(0.0), -100);
        assert_eq!(dispatcher_rate(3.0), 100);
    }

    #[test]
    fn interrupt_when_idle_is_harmless() {
        let narrator = SystemNarrator::new(SpeechProgram::EspeakNg, voice(None, 1.0));
        narrator.interrupt();
        narrator.interrupt();
        assert_eq!(*narrator.interrupts.borrow(), 2);
    }
}
