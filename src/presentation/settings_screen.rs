use serde::Serialize;

use crate::models::{AppSettings, PlaybackSpeed, RecordingQuality, SettingsChange, Theme};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionItem<T> {
    pub value: T,
    pub label: &'static str,
    pub selected: bool,
}

/// Option tables for the settings screen, each with the current choice marked.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsScreen {
    pub settings: AppSettings,
    pub qualities: Vec<OptionItem<RecordingQuality>>,
    pub speeds: Vec<OptionItem<PlaybackSpeed>>,
    pub themes: Vec<OptionItem<Theme>>,
    pub auto_save: bool,
}

impl SettingsScreen {
    pub fn new(settings: AppSettings) -> Self {
        Self {
            settings,
            qualities: options(&RecordingQuality::ALL, settings.recording_quality, quality_label),
            speeds: options(&PlaybackSpeed::ALL, settings.playback_speed, speed_label),
            themes: options(&Theme::ALL, settings.theme, theme_label),
            auto_save: settings.auto_save,
        }
    }

    /// Screen for the settings after `change`; the caller persists `settings`.
    pub fn apply(&self, change: SettingsChange) -> Self {
        Self::new(self.settings.apply(change))
    }
}

fn options<T: Copy + PartialEq>(
    all: &[T],
    current: T,
    label: fn(T) -> &'static str,
) -> Vec<OptionItem<T>> {
    all.iter()
        .map(|&value| OptionItem {
            value,
            label: label(value),
            selected: value == current,
        })
        .collect()
}

pub fn quality_label(quality: RecordingQuality) -> &'static str {
    match quality {
        RecordingQuality::Low => "Low (Small file size)",
        RecordingQuality::Medium => "Medium (Balanced)",
        RecordingQuality::High => "High (Best quality)",
    }
}

pub fn speed_label(speed: PlaybackSpeed) -> &'static str {
    match speed {
        PlaybackSpeed::Half => "0.5x",
        PlaybackSpeed::ThreeQuarters => "0.75x",
        PlaybackSpeed::Normal => "1.0x (Normal)",
        PlaybackSpeed::OneAndQuarter => "1.25x",
        PlaybackSpeed::OneAndHalf => "1.5x",
        PlaybackSpeed::Double => "2.0x",
    }
}

pub fn theme_label(theme: Theme) -> &'static str {
    match theme {
        Theme::Light => "Light",
        Theme::Dark => "Dark",
        Theme::System => "System",
    }
}
