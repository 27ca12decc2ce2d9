use std::path::PathBuf;
use clap::{Args, Parser, Subcommand};

use crate::state::{Locale, Settings, SpeechProgram, VoiceGender};

#[derive(Debug, Parser)]
#[command(name = "read-to-me", version, about = "Reads text or encyclopedia summaries aloud")]
pub struct Cli {
    /// Settings file to use instead of the one in the user config directory
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Look up a topic and read its summary sentence by sentence
    Read {
        #[arg(required = true, num_args = 1..)]
        topic: Vec<String>,
        #[command(flatten)]
        overrides: Overrides,
    },
    /// Speak the given text
    Say {
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
        #[command(flatten)]
        overrides: Overrides,
    },
    /// Inspect or change stored settings
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
}

#[derive(Debug, Subcommand)]
pub enum SettingsAction {
    Show,
    Reset,
    Set(Overrides),
}

/// Per-invocation settings overrides
#[derive(Debug, Clone, Default, Args)]
pub struct Overrides {
    /// Language edition and voice locale (pl or en)
    #[arg(long)]
    pub lang: Option<Locale>,
    /// Preferred voice gender (male or female)
    #[arg(long)]
    pub gender: Option<VoiceGender>,
    /// Speech rate multiplier
    #[arg(long, value_parser = parse_speed)]
    pub speed: Option<f32>,
    /// Pause between sentences in milliseconds
    #[arg(long)]
    pub delay_ms: Option<u64>,
    /// Skip fragments shorter than this many characters
    #[arg(long)]
    pub min_chars: Option<usize>,
    /// Speech program: auto, say, espeak-ng, spd-say
    #[arg(long)]
    pub program: Option<SpeechProgram>,
    /// Voice name passed to the speech program
    #[arg(long)]
    pub voice: Option<String>,
}

impl Overrides {
    pub fn apply(&self, settings: &mut Settings) {
        if let Some(lang) = self.lang {
            settings.voice.locale = lang;
        }
        if let Some(gender) = self.gender {
            settings.voice.gender = Some(gender);
        }
        if let Some(speed) = self.speed {
            settings.voice.speed = speed;
            settings.voice.sanitize();
        }
        if let Some(delay_ms) = self.delay_ms {
            settings.playback.delay_ms = delay_ms;
        }
        if let Some(min_chars) = self.min_chars {
            settings.playback.min_fragment_chars = min_chars;
        }
        if let Some(program) = self.program {
            settings.voice.program = program;
        }
        if let Some(voice) = &self.voice {
            settings.voice.voice_name = Some(voice.clone());
        }
    }
}

fn parse_speed(value: &str) -> Result<f32, String> {
    let speed: f32 = value
        .parse()
        .map_err(|_| format!("'{}' is not a number", value))?;
    if !speed.is_finite() || speed <= 0.0 {
        return Err(format!("speed must be a positive number, got '{}'", value));
    }
    Ok(speed)
}
