use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use serde::{Serialize, Deserialize};

/// Coarse view of the controller, mirrored to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerStatus {
    Idle,
    Playing,
    WaitingBetween,
    Stopped,
}

impl Default for PlayerStatus {
    fn default() -> Self {
        Self::Idle
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub playback: PlaybackSettings,
    pub voice: VoiceSettings,
    pub source: SourceSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackSettings {
    /// Pause between two sentences, in milliseconds.
    pub delay_ms: u64,
    /// Fragments shorter than this (in characters, after trimming) are skipped.
    pub min_fragment_chars: usize,
}

impl PlaybackSettings {
    pub fn delay(&self) -> Duration {
        Duration::from_millis(self.delay_ms)
    }
}

impl Default for PlaybackSettings {
    fn default() -> Self {
        Self {
            delay_ms: 1500,
            min_fragment_chars: 11,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceSettings {
    pub locale: Locale,
    pub gender: Option<VoiceGender>,
    /// Rate multiplier, 1.0 is the program's normal speed.
    pub speed: f32,
    pub program: SpeechProgram,
    /// Explicit voice name handed to the speech program as-is.
    pub voice_name: Option<String>,
}

impl VoiceSettings {
    pub const MIN_SPEED: f32 = 0.25;
    pub const MAX_SPEED: f32 = 4.0;

    /// Clamps `speed` into the supported range; a non-finite value is
    /// rejected and replaced by the default.
    pub fn sanitize(&mut self) {
        if !self.speed.is_finite() {
            tracing::warn!("Ignoring invalid speech speed {}", self.speed);
            self.speed = Self::default().speed;
        }
        self.speed = self.speed.clamp(Self::MIN_SPEED, Self::MAX_SPEED);
    }
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            locale: Locale::Pl,
            gender: Some(VoiceGender::Male),
            speed: 1.0,
            program: SpeechProgram::Auto,
            voice_name: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSettings {
    /// Overrides `https://{locale}.wikipedia.org` when set.
    pub base_url: Option<String>,
    pub timeout_s: u64,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_s: 15,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Locale {
    Pl,
    En,
}

impl Locale {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Pl => "pl",
            Self::En => "en",
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pl" | "pl-pl" => Ok(Self::Pl),
            "en" | "en-us" | "en-gb" => Ok(Self::En),
            other => Err(format!("unsupported locale '{}' (expected pl or en)", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoiceGender {
    Male,
    Female,
}

impl FromStr for VoiceGender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "male" | "m" => Ok(Self::Male),
            "female" | "f" => Ok(Self::Female),
            other => Err(format!("unsupported gender '{}' (expected male or female)", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SpeechProgram {
    Auto,
    Say,
    EspeakNg,
    SpdSay,
}

impl SpeechProgram {
    /// Resolves `Auto` for the current platform.
    pub fn resolve(self) -> Self {
        match self {
            Self::Auto if cfg!(target_os = "macos") => Self::Say,
            Self::Auto => Self::EspeakNg,
            other => other,
        }
    }
}

impl FromStr for SpeechProgram {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "say" => Ok(Self::Say),
            "espeak-ng" | "espeak" => Ok(Self::EspeakNg),
            "spd-say" => Ok(Self::SpdSay),
            other => Err(format!("unknown speech program '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_settings_fill_in_defaults() {
        let settings: Settings =
            serde_json::from_str(r#"{"playback": {"delay_ms": 250}}"#).unwrap();
        assert_eq!(settings.playback.delay_ms, 250);
        assert_eq!(settings.playback.min_fragment_chars, 11);
        assert_eq!(settings.voice, VoiceSettings::default());
    }

    #[test]
    fn enums_use_wire_names() {
        let json = serde_json::to_value(&VoiceSettings::default()).unwrap();
        assert_eq!(json["locale"], "pl");
        assert_eq!(json["gender"], "male");
        assert_eq!(json["program"], "auto");
        assert_eq!(
            serde_json::to_value(SpeechProgram::EspeakNg).unwrap(),
            "espeak-ng"
        );
    }

    #[test]
    fn parses_cli_spellings() {
        assert_eq!("EN".parse::<Locale>().unwrap(), Locale::En);
        assert_eq!("pl-PL".parse::<Locale>().unwrap(), Locale::Pl);
        assert!("de".parse::<Locale>().is_err());
        assert_eq!("f".parse::<VoiceGender>().unwrap(), VoiceGender::Female);
        assert_eq!("espeak".parse::<SpeechProgram>().unwrap(), SpeechProgram::EspeakNg);
    }

    #[test]
    fn sanitize_rejects_non_finite_speed() {
        let mut voice = VoiceSettings {
            speed: f32::NAN,
            ..VoiceSettings::default()
        };
        voice.sanitize();
        assert_eq!(voice.speed, 1.0);

        voice.speed = f32::INFINITY;
        voice.sanitize();
        assert_eq!(voice.speed, 1.0);

        voice.speed = 0.1;
        voice.sanitize();
        assert_eq!(voice.speed, VoiceSettings::MIN_SPEED);
    }

    #[test]
    fn auto_program_resolves_to_a_concrete_one() {
        assert_ne!(SpeechProgram::Auto.resolve(), SpeechProgram::Auto);
        assert_eq!(SpeechProgram::SpdSay.resolve(), SpeechProgram::SpdSay);
    }
}
