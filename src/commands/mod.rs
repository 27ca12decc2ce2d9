pub mod console;
pub mod settings;
pub mod tts;
