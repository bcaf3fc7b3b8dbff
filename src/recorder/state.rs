use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::RecordingQuality;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub enum RecorderStatus {
    #[default]
    Idle,
    Recording,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct RecorderState {
    pub status: RecorderStatus,
    pub session_id: Option<String>,
    pub quality: Option<RecordingQuality>,
    pub started_at: Option<DateTime<Utc>>,
}

impl RecorderState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_recording(&self) -> bool {
        self.status == RecorderStatus::Recording
    }

    pub fn begin(
        &mut self,
        session_id: String,
        quality: RecordingQuality,
        started_at: DateTime<Utc>,
    ) {
        *self = Self {
            status: RecorderStatus::Recording,
            session_id: Some(session_id),
            quality: Some(quality),
            started_at: Some(started_at),
        };
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Whole seconds since the recording started; zero when idle.
    pub fn elapsed_secs(&self, now: DateTime<Utc>) -> u64 {
        match (self.status, self.started_at) {
            (RecorderStatus::Recording, Some(started)) => {
                (now - started).num_seconds().max(0) as u64
            }
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackState {
    pub note_id: Option<String>,
    pub rate: Option<f32>,
}

impl PlaybackState {
    pub fn playing(note_id: String, rate: f32) -> Self {
        Self {
            note_id: Some(note_id),
            rate: Some(rate),
        }
    }

    pub fn is_playing(&self) -> bool {
        self.note_id.is_some()
    }

    pub fn is_playing_note(&self, id: &str) -> bool {
        self.note_id.as_deref() == Some(id)
    }
}
