use chrono::{DateTime, Local, TimeZone};
use serde::Serialize;

use crate::{catalog::matches_query, models::VoiceNote, recorder::RecorderState};

const EMPTY_LIBRARY: &str = "No voice notes yet. Tap the record button to create one!";
const NO_MATCHES: &str = "No matching notes found";
const UNTITLED: &str = "Untitled";
const DATE_FORMAT: &str = "%b %-d, %Y %-I:%M %p";

/// One line of the note list, already formatted for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteRow {
    pub id: String,
    pub title: String,
    pub date: String,
    pub duration: String,
    pub size: String,
}

impl NoteRow {
    pub fn from_note(note: &VoiceNote) -> Self {
        Self::from_note_in(note, &Local)
    }

    pub fn from_note_in<Tz: TimeZone>(note: &VoiceNote, tz: &Tz) -> Self
    where
        Tz::Offset: std::fmt::Display,
    {
        let title = if note.title.trim().is_empty() {
            UNTITLED.to_string()
        } else {
            note.title.clone()
        };

        Self {
            id: note.id.clone(),
            title,
            date: format_date_in(&note.date, tz),
            duration: format_duration(note.duration),
            size: format_file_size(note.size),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NoteListView {
    pub query: String,
    pub rows: Vec<NoteRow>,
    /// Set only when `rows` is empty.
    pub empty_message: Option<String>,
}

impl NoteListView {
    /// Filters `notes` by `query` and keeps their order.
    pub fn build(notes: &[VoiceNote], query: &str) -> Self {
        let rows: Vec<NoteRow> = notes
            .iter()
            .filter(|note| matches_query(note, query))
            .map(NoteRow::from_note)
            .collect();

        let empty_message = rows.is_empty().then(|| {
            if query.trim().is_empty() {
                EMPTY_LIBRARY.to_string()
            } else {
                NO_MATCHES.to_string()
            }
        });

        Self {
            query: query.to_string(),
            rows,
            empty_message,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// `m:ss`, minutes unbounded.
pub fn format_duration(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

pub fn format_file_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * 1024;

    if bytes < KB {
        format!("{bytes} B")
    } else if bytes < MB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    }
}

/// Local-time `MMM d, yyyy h:mm a`. Unparseable dates are shown as stored.
pub fn format_date(date: &str) -> String {
    format_date_in(date, &Local)
}

fn format_date_in<Tz: TimeZone>(date: &str, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    match DateTime::parse_from_rfc3339(date) {
        Ok(parsed) => parsed.with_timezone(tz).format(DATE_FORMAT).to_string(),
        Err(_) => date.to_string(),
    }
}

pub fn record_button_label(state: &RecorderState) -> &'static str {
    if state.is_recording() {
        "Stop Recording"
    } else {
        "Start Recording"
    }
}
