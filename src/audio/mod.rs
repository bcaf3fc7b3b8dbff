//! Capture and playback adapters.
//!
//! Platform audio objects are not `Send`, so the concrete backends keep them
//! on dedicated threads. Callers only ever hold [`CaptureSession`] and
//! [`PlaybackHandle`], which release their resources when dropped.

pub mod capture;
pub mod permissions;
pub mod playback;

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use log::warn;
use uuid::Uuid;

use crate::{
    error::{Result, VoiceNoteError},
    models::RecordingQuality,
};

pub use capture::CpalRecorder;
pub use permissions::{DevicePermissionGate, PermissionGate};
pub use playback::RodioPlayer;

/// Device settings requested for a recording quality. All presets are 16-bit PCM.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CapturePreset {
    pub sample_rate: u32,
    pub channels: u16,
}

impl From<RecordingQuality> for CapturePreset {
    fn from(quality: RecordingQuality) -> Self {
        match quality {
            RecordingQuality::Low => Self {
                sample_rate: 16_000,
                channels: 1,
            },
            RecordingQuality::Medium => Self {
                sample_rate: 22_050,
                channels: 1,
            },
            RecordingQuality::High => Self {
                sample_rate: 44_100,
                channels: 2,
            },
        }
    }
}

/// Result of a finished capture. The file at `path` exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedAudio {
    pub path: PathBuf,
    pub duration_secs: u64,
    /// File extension the backend wrote, without the dot.
    pub extension: String,
}

pub trait AudioRecorder: Send + Sync {
    fn start_capture(&self, quality: RecordingQuality) -> Result<CaptureSession>;
}

/// Backend side of an in-progress recording.
pub trait ActiveCapture: Send {
    fn finish(self: Box<Self>) -> Result<CapturedAudio>;

    /// Stops capturing and discards whatever was written.
    fn abort(self: Box<Self>);
}

pub trait AudioPlayer: Send + Sync {
    fn play(&self, path: &Path, rate: f32) -> Result<PlaybackHandle>;
}

/// Backend side of a loaded sound.
pub trait ActivePlayback: Send {
    fn is_finished(&self) -> bool;

    fn stop(self: Box<Self>);
}

/// An in-progress recording. Dropping it without calling [`finish`](Self::finish)
/// aborts the capture.
pub struct CaptureSession {
    id: String,
    quality: RecordingQuality,
    started_at: DateTime<Utc>,
    inner: Option<Box<dyn ActiveCapture>>,
}

impl CaptureSession {
    pub fn new(quality: RecordingQuality, inner: Box<dyn ActiveCapture>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            quality,
            started_at: Utc::now(),
            inner: Some(inner),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn quality(&self) -> RecordingQuality {
        self.quality
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finish(mut self) -> Result<CapturedAudio> {
        let inner = self
            .inner
            .take()
            .ok_or_else(|| VoiceNoteError::capture("capture session already finished"))?;
        inner.finish()
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.take() {
            warn!("Capture session {} released without finishing; discarding", self.id);
            inner.abort();
        }
    }
}

/// A loaded sound. Dropping it stops playback.
pub struct PlaybackHandle {
    path: PathBuf,
    rate: f32,
    inner: Option<Box<dyn ActivePlayback>>,
}

impl PlaybackHandle {
    pub fn new(path: PathBuf, rate: f32, inner: Box<dyn ActivePlayback>) -> Self {
        Self {
            path,
            rate,
            inner: Some(inner),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn rate(&self) -> f32 {
        self.rate
    }

    pub fn is_finished(&self) -> bool {
        self.inner
            .as_ref()
            .map_or(true, |inner| inner.is_finished())
    }

    pub fn stop(mut self) {
        if let Some(inner) = self.inner.take() {
            inner.stop();
        }
    }
}

impl Drop for PlaybackHandle {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.take() {
            inner.stop();
        }
    }
}
