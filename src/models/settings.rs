//! User preferences stored under the `@app_settings` key.

use std::{fmt, str::FromStr};

use log::warn;
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RecordingQuality {
    Low,
    Medium,
    #[default]
    High,
}

impl RecordingQuality {
    pub const ALL: [RecordingQuality; 3] = [Self::Low, Self::Medium, Self::High];

    pub fn as_str(&self) -> &'static str {
        match self {
            RecordingQuality::Low => "low",
            RecordingQuality::Medium => "medium",
            RecordingQuality::High => "high",
        }
    }
}

/// Playback rates offered by the settings screen. Serialized as a bare JSON number.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(try_from = "f64", into = "f64")]
pub enum PlaybackSpeed {
    Half,
    ThreeQuarters,
    #[default]
    Normal,
    OneAndQuarter,
    OneAndHalf,
    Double,
}

impl PlaybackSpeed {
    pub const ALL: [PlaybackSpeed; 6] = [
        Self::Half,
        Self::ThreeQuarters,
        Self::Normal,
        Self::OneAndQuarter,
        Self::OneAndHalf,
        Self::Double,
    ];

    pub fn rate(self) -> f32 {
        match self {
            PlaybackSpeed::Half => 0.5,
            PlaybackSpeed::ThreeQuarters => 0.75,
            PlaybackSpeed::Normal => 1.0,
            PlaybackSpeed::OneAndQuarter => 1.25,
            PlaybackSpeed::OneAndHalf => 1.5,
            PlaybackSpeed::Double => 2.0,
        }
    }
}

impl From<PlaybackSpeed> for f64 {
    fn from(speed: PlaybackSpeed) -> Self {
        f64::from(speed.rate())
    }
}

impl TryFrom<f64> for PlaybackSpeed {
    type Error = String;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        PlaybackSpeed::ALL
            .into_iter()
            .find(|speed| (f64::from(speed.rate()) - value).abs() < 1e-6)
            .ok_or_else(|| format!("unsupported playback speed {value}"))
    }
}

impl fmt::Display for PlaybackSpeed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x", self.rate())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    #[default]
    Dark,
    System,
}

impl Theme {
    pub const ALL: [Theme; 3] = [Self::Light, Self::Dark, Self::System];

    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
            Theme::System => "system",
        }
    }
}

impl FromStr for RecordingQuality {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|quality| quality.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| format!("unknown recording quality '{value}'"))
    }
}

impl FromStr for Theme {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|theme| theme.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| format!("unknown theme '{value}'"))
    }
}

impl FromStr for PlaybackSpeed {
    type Err = String;

    /// Accepts `1.25` as well as `1.25x`.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim().trim_end_matches(['x', 'X']);
        let parsed: f64 = trimmed
            .parse()
            .map_err(|_| format!("invalid playback speed '{value}'"))?;
        PlaybackSpeed::try_from(parsed)
    }
}

/// Application preferences. A field that is missing or holds a value this
/// build does not know takes its default; the other fields are kept.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct AppSettings {
    #[serde(deserialize_with = "quality_or_default")]
    pub recording_quality: RecordingQuality,
    #[serde(deserialize_with = "speed_or_default")]
    pub playback_speed: PlaybackSpeed,
    #[serde(deserialize_with = "auto_save_or_default")]
    pub auto_save: bool,
    #[serde(deserialize_with = "theme_or_default")]
    pub theme: Theme,
}

fn field_or<'de, D, T>(deserializer: D, field: &str, fallback: T) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    match T::deserialize(&raw) {
        Ok(value) => Ok(value),
        Err(err) => {
            warn!("Ignoring stored {field} {raw}: {err}");
            Ok(fallback)
        }
    }
}

fn quality_or_default<'de, D: Deserializer<'de>>(d: D) -> Result<RecordingQuality, D::Error> {
    field_or(d, "recordingQuality", AppSettings::default().recording_quality)
}

fn speed_or_default<'de, D: Deserializer<'de>>(d: D) -> Result<PlaybackSpeed, D::Error> {
    field_or(d, "playbackSpeed", AppSettings::default().playback_speed)
}

fn auto_save_or_default<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    field_or(d, "autoSave", AppSettings::default().auto_save)
}

fn theme_or_default<'de, D: Deserializer<'de>>(d: D) -> Result<Theme, D::Error> {
    field_or(d, "theme", AppSettings::default().theme)
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            recording_quality: RecordingQuality::High,
            playback_speed: PlaybackSpeed::Normal,
            auto_save: true,
            theme: Theme::Dark,
        }
    }
}

/// A single settings-screen interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "camelCase")]
pub enum SettingsChange {
    RecordingQuality(RecordingQuality),
    PlaybackSpeed(PlaybackSpeed),
    AutoSave(bool),
    Theme(Theme),
}

impl AppSettings {
    pub fn apply(mut self, change: SettingsChange) -> Self {
        match change {
            SettingsChange::RecordingQuality(quality) => self.recording_quality = quality,
            SettingsChange::PlaybackSpeed(speed) => self.playback_speed = speed,
            SettingsChange::AutoSave(enabled) => self.auto_save = enabled,
            SettingsChange::Theme(theme) => self.theme = theme,
        }
        self
    }
}

impl SettingsChange {
    /// Parses a `field value` pair such as `playback-speed 1.5` or `theme light`.
    pub fn parse(field: &str, value: &str) -> Result<Self, String> {
        match field.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "recording-quality" | "quality" | "recordingquality" => {
                value.parse().map(SettingsChange::RecordingQuality)
            }
            "playback-speed" | "speed" | "playbackspeed" => {
                value.parse().map(SettingsChange::PlaybackSpeed)
            }
            "auto-save" | "autosave" => match value.trim().to_ascii_lowercase().as_str() {
                "true" | "on" | "yes" | "1" => Ok(SettingsChange::AutoSave(true)),
                "false" | "off" | "no" | "0" => Ok(SettingsChange::AutoSave(false)),
                _ => Err(format!("invalid auto-save value '{value}'")),
            },
            "theme" => value.parse().map(SettingsChange::Theme),
            other => Err(format!("unknown setting '{other}'")),
        }
    }
}
