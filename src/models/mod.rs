pub mod settings;
pub mod voice_note;

pub use settings::{AppSettings, PlaybackSpeed, RecordingQuality, SettingsChange, Theme};
pub use voice_note::{default_title, iso_timestamp, NewVoiceNote, VoiceNote};
