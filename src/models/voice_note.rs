//! Voice note records as stored under the `@voice_notes` key.

use chrono::{DateTime, Local, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Metadata for one recorded audio file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VoiceNote {
    pub id: String,
    pub uri: String,
    pub title: String,
    /// Whole seconds, taken from the capture result.
    pub duration: u64,
    /// ISO-8601 creation timestamp.
    pub date: String,
    /// File size in bytes at creation time.
    pub size: u64,
}

/// A note that has not been assigned an id yet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NewVoiceNote {
    pub uri: String,
    pub title: String,
    pub duration: u64,
    pub date: String,
    pub size: u64,
}

impl NewVoiceNote {
    pub fn with_id(self, id: String) -> VoiceNote {
        VoiceNote {
            id,
            uri: self.uri,
            title: self.title,
            duration: self.duration,
            date: self.date,
            size: self.size,
        }
    }
}

impl VoiceNote {
    pub fn date_time(&self) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(&self.date)
            .ok()
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Applies `incoming` on top of `self`. The stored `date` wins unless the
    /// incoming record carries a non-empty one.
    pub fn merged_with(&self, incoming: VoiceNote) -> VoiceNote {
        let date = if incoming.date.trim().is_empty() {
            self.date.clone()
        } else {
            incoming.date
        };

        VoiceNote {
            id: self.id.clone(),
            uri: incoming.uri,
            title: incoming.title,
            duration: incoming.duration,
            date,
            size: incoming.size,
        }
    }
}

/// Formats a timestamp the way notes are stamped on disk, e.g. `2024-03-01T09:15:00.123Z`.
pub fn iso_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Default title for a fresh recording, e.g. `Recording Mar 1, 2024 9:15 AM`.
pub fn default_title(at: DateTime<Local>) -> String {
    format!("Recording {}", at.format("%b %-d, %Y %-I:%M %p"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn note(date: &str) -> VoiceNote {
        VoiceNote {
            id: "1".into(),
            uri: "/tmp/recording-1.wav".into(),
            title: "Recording 1".into(),
            duration: 12,
            date: date.into(),
            size: 4096,
        }
    }

    #[test]
    fn serializes_with_camel_case_wire_names() {
        let json = serde_json::to_value(note("2024-03-01T09:15:00.000Z")).unwrap();
        assert_eq!(json["uri"], "/tmp/recording-1.wav");
        assert_eq!(json["duration"], 12);
        assert_eq!(json["size"], 4096);
    }

    #[test]
    fn merge_keeps_stored_date_when_incoming_is_empty() {
        let stored = note("2024-03-01T09:15:00.000Z");
        let mut incoming = stored.clone();
        incoming.title = "Meeting notes".into();
        incoming.date = String::new();

        let merged = stored.merged_with(incoming);
        assert_eq!(merged.title, "Meeting notes");
        assert_eq!(merged.date, "2024-03-01T09:15:00.000Z");
    }

    #[test]
    fn merge_takes_explicit_date() {
        let stored = note("2024-03-01T09:15:00.000Z");
        let mut incoming = stored.clone();
        incoming.date = "2025-01-01T00:00:00.000Z".into();

        assert_eq!(stored.merged_with(incoming).date, "2025-01-01T00:00:00.000Z");
    }

    #[test]
    fn iso_timestamp_has_millis_and_zulu_suffix() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 9, 15, 0).unwrap();
        assert_eq!(iso_timestamp(at), "2024-03-01T09:15:00.000Z");
    }

    #[test]
    fn default_title_uses_twelve_hour_clock() {
        let at = Local.with_ymd_and_hms(2024, 3, 1, 21, 5, 0).unwrap();
        assert_eq!(default_title(at), "Recording Mar 1, 2024 9:05 PM");
    }
}
