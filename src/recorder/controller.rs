use std::{path::PathBuf, sync::Arc};

use chrono::{Local, Utc};
use log::{error, info, warn};
use serde::Serialize;
use tokio::sync::{broadcast, Mutex};

use crate::{
    audio::{AudioPlayer, AudioRecorder, CaptureSession, CapturedAudio, PermissionGate, PlaybackHandle},
    catalog::{audio_path, NoteCatalog},
    error::{Result, VoiceNoteError},
    models::{default_title, iso_timestamp, AppSettings, NewVoiceNote, SettingsChange, VoiceNote},
    settings::SettingsStore,
    utils::fs::{move_file, unique_recording_path},
};

use super::{PlaybackState, RecorderState};

const EVENT_CAPACITY: usize = 32;

/// Platform audio backends the controller drives.
#[derive(Clone)]
pub struct AudioBackends {
    pub recorder: Arc<dyn AudioRecorder>,
    pub player: Arc<dyn AudioPlayer>,
    pub permissions: Arc<dyn PermissionGate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "note", rename_all = "camelCase")]
pub enum RecordingOutcome {
    /// Auto-save is on; the note is in the catalog.
    Saved(VoiceNote),
    /// Auto-save is off; call `save_pending` or `discard_pending`.
    Pending(NewVoiceNote),
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "payload", rename_all = "camelCase")]
pub enum ControllerEvent {
    RecorderStateChanged(RecorderState),
    PlaybackStateChanged(PlaybackState),
    NotesChanged,
    SettingsChanged(AppSettings),
}

#[derive(Default)]
struct RecordingSlot {
    state: RecorderState,
    session: Option<CaptureSession>,
    pending: Option<NewVoiceNote>,
}

#[derive(Default)]
struct PlaybackSlot {
    state: PlaybackState,
    handle: Option<PlaybackHandle>,
}

/// Owns the single capture session and the single playback handle, and routes
/// every user action through the catalog and settings stores.
#[derive(Clone)]
pub struct VoiceNoteController {
    catalog: Arc<NoteCatalog>,
    settings: Arc<SettingsStore>,
    audio: AudioBackends,
    recordings_dir: PathBuf,
    recording: Arc<Mutex<RecordingSlot>>,
    playback: Arc<Mutex<PlaybackSlot>>,
    events: broadcast::Sender<ControllerEvent>,
}

impl VoiceNoteController {
    pub fn new(
        catalog: Arc<NoteCatalog>,
        settings: Arc<SettingsStore>,
        audio: AudioBackends,
        recordings_dir: PathBuf,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            catalog,
            settings,
            audio,
            recordings_dir,
            recording: Arc::new(Mutex::new(RecordingSlot::default())),
            playback: Arc::new(Mutex::new(PlaybackSlot::default())),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ControllerEvent> {
        self.events.subscribe()
    }

    pub async fn recorder_state(&self) -> RecorderState {
        self.recording.lock().await.state.clone()
    }

    pub async fn pending_recording(&self) -> Option<NewVoiceNote> {
        self.recording.lock().await.pending.clone()
    }

    pub async fn start_recording(&self) -> Result<RecorderState> {
        let mut slot = self.recording.lock().await;
        if slot.state.is_recording() {
            return Err(VoiceNoteError::capture("a recording is already in progress"));
        }
        if slot.pending.is_some() {
            return Err(VoiceNoteError::InvalidInput(
                "save or discard the previous recording first".into(),
            ));
        }

        if !self.audio.permissions.request_microphone() {
            return Err(VoiceNoteError::PermissionDenied(
                "audio recording permission is needed to record voice notes".into(),
            ));
        }

        let quality = self.settings.get_or_default().await.recording_quality;
        let recorder = self.audio.recorder.clone();
        let session = tokio::task::spawn_blocking(move || recorder.start_capture(quality))
            .await
            .map_err(|err| VoiceNoteError::Capture(format!("capture task failed: {err}")))??;

        slot.state
            .begin(session.id().to_string(), quality, session.started_at());
        slot.session = Some(session);
        let snapshot = slot.state.clone();
        drop(slot);

        info!("Recording started ({})", quality.as_str());
        self.emit(ControllerEvent::RecorderStateChanged(snapshot.clone()));
        Ok(snapshot)
    }

    /// Stops the capture and stores the file. The recorder is back to idle
    /// afterwards whether or not this succeeds.
    pub async fn stop_recording(&self) -> Result<RecordingOutcome> {
        let mut slot = self.recording.lock().await;
        let Some(session) = slot.session.take() else {
            return Err(VoiceNoteError::capture("no recording in progress"));
        };
        slot.state.reset();
        let idle = slot.state.clone();

        let result = self.store_capture(session).await;
        let outcome = match result {
            Ok(note) => {
                if self.settings.get_or_default().await.auto_save {
                    self.save_note(note).await.map(RecordingOutcome::Saved)
                } else {
                    slot.pending = Some(note.clone());
                    Ok(RecordingOutcome::Pending(note))
                }
            }
            Err(err) => Err(err),
        };
        drop(slot);

        self.emit(ControllerEvent::RecorderStateChanged(idle));
        match &outcome {
            Ok(RecordingOutcome::Saved(note)) => {
                info!("Recording saved as note {}", note.id);
                self.emit(ControllerEvent::NotesChanged);
            }
            Ok(RecordingOutcome::Pending(note)) => {
                info!("Recording kept pending at {}", note.uri);
            }
            Err(err) => error!("Failed to finish recording: {err}"),
        }
        outcome
    }

    /// Saves the recording held back because auto-save was off.
    pub async fn save_pending(&self, title: Option<String>) -> Result<VoiceNote> {
        let mut slot = self.recording.lock().await;
        let mut note = slot
            .pending
            .take()
            .ok_or_else(|| VoiceNoteError::InvalidInput("no pending recording".into()))?;

        if let Some(title) = title.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()) {
            note.title = title;
        }

        match self.catalog.create(note.clone()).await {
            Ok(saved) => {
                drop(slot);
                self.emit(ControllerEvent::NotesChanged);
                Ok(saved)
            }
            Err(err) => {
                slot.pending = Some(note);
                Err(err)
            }
        }
    }

    /// Drops the pending recording and its file. Returns `false` when nothing was pending.
    pub async fn discard_pending(&self) -> Result<bool> {
        let Some(note) = self.recording.lock().await.pending.take() else {
            return Ok(false);
        };

        let path = audio_path(&note.uri);
        if let Err(err) = tokio::fs::remove_file(&path).await {
            warn!("Failed to remove discarded recording {}: {err}", path.display());
        }
        Ok(true)
    }

    pub async fn play_note(&self, id: &str) -> Result<PlaybackState> {
        let note = self
            .catalog
            .get(id)
            .await
            .ok_or_else(|| VoiceNoteError::NotFound(id.to_string()))?;
        let rate = self.settings.get_or_default().await.playback_speed.rate();

        let mut slot = self.playback.lock().await;
        if let Some(previous) = slot.handle.take() {
            previous.stop();
        }
        slot.state = PlaybackState::default();

        let player = self.audio.player.clone();
        let path = audio_path(&note.uri);
        let started = tokio::task::spawn_blocking(move || player.play(&path, rate))
            .await
            .map_err(|err| VoiceNoteError::Playback(format!("playback task failed: {err}")))
            .and_then(|result| result);

        match started {
            Ok(handle) => {
                slot.handle = Some(handle);
                slot.state = PlaybackState::playing(note.id.clone(), rate);
                let snapshot = slot.state.clone();
                drop(slot);
                self.emit(ControllerEvent::PlaybackStateChanged(snapshot.clone()));
                Ok(snapshot)
            }
            Err(err) => {
                drop(slot);
                error!("Failed to play note {}: {err}", note.id);
                self.emit(ControllerEvent::PlaybackStateChanged(PlaybackState::default()));
                Err(err)
            }
        }
    }

    /// Returns `true` when something was playing.
    pub async fn stop_playback(&self) -> bool {
        let mut slot = self.playback.lock().await;
        let was_playing = match slot.handle.take() {
            Some(handle) => {
                handle.stop();
                true
            }
            None => false,
        };
        slot.state = PlaybackState::default();
        drop(slot);

        if was_playing {
            self.emit(ControllerEvent::PlaybackStateChanged(PlaybackState::default()));
        }
        was_playing
    }

    /// Releases the handle once the sound has played to the end.
    pub async fn playback_state(&self) -> PlaybackState {
        let mut slot = self.playback.lock().await;
        let finished = slot.handle.as_ref().is_some_and(|handle| handle.is_finished());
        if finished {
            slot.handle = None;
            slot.state = PlaybackState::default();
            drop(slot);
            self.emit(ControllerEvent::PlaybackStateChanged(PlaybackState::default()));
            return PlaybackState::default();
        }
        slot.state.clone()
    }

    pub async fn is_playing(&self) -> bool {
        self.playback_state().await.is_playing()
    }

    pub async fn list_notes(&self, query: &str) -> Vec<VoiceNote> {
        self.catalog.search(query).await
    }

    pub async fn rename_note(&self, id: &str, title: &str) -> Result<VoiceNote> {
        let title = title.trim();
        if title.is_empty() {
            return Err(VoiceNoteError::InvalidInput("title must not be empty".into()));
        }

        let renamed = self.catalog.rename(id, title).await?;
        self.emit(ControllerEvent::NotesChanged);
        Ok(renamed)
    }

    pub async fn delete_note(&self, id: &str) -> Result<bool> {
        let playing_this = self.playback.lock().await.state.is_playing_note(id);
        if playing_this {
            self.stop_playback().await;
        }

        let deleted = self.catalog.delete(id).await?;
        if deleted {
            self.emit(ControllerEvent::NotesChanged);
        }
        Ok(deleted)
    }

    pub async fn settings(&self) -> AppSettings {
        self.settings.get_or_default().await
    }

    pub async fn update_setting(&self, change: SettingsChange) -> Result<AppSettings> {
        let merged = self.settings.get_or_default().await.apply(change);
        self.settings.set(&merged).await?;
        self.emit(ControllerEvent::SettingsChanged(merged));
        Ok(merged)
    }

    /// Releases playback and abandons any capture still running.
    pub async fn shutdown(&self) {
        self.stop_playback().await;

        let session = {
            let mut slot = self.recording.lock().await;
            slot.state.reset();
            slot.session.take()
        };
        if let Some(session) = session {
            warn!("Shutting down with recording {} in progress", session.id());
            // Dropping the session aborts it; that joins the capture thread.
            if let Err(err) = tokio::task::spawn_blocking(move || drop(session)).await {
                warn!("Aborting the capture failed: {err}");
            }
        }
    }

    async fn store_capture(&self, session: CaptureSession) -> Result<NewVoiceNote> {
        let captured: CapturedAudio = tokio::task::spawn_blocking(move || session.finish())
            .await
            .map_err(|err| VoiceNoteError::Capture(format!("capture task failed: {err}")))??;

        let now = Utc::now();
        let target = unique_recording_path(
            &self.recordings_dir,
            now.timestamp_millis(),
            &captured.extension,
        )
        .await;

        if let Err(err) = move_file(&captured.path, &target).await {
            if let Err(cleanup) = tokio::fs::remove_file(&captured.path).await {
                warn!("Failed to clean up {}: {cleanup}", captured.path.display());
            }
            return Err(VoiceNoteError::Capture(format!(
                "failed to store recording: {err:#}"
            )));
        }

        let size = tokio::fs::metadata(&target)
            .await
            .map(|meta| meta.len())
            .map_err(|err| VoiceNoteError::Capture(format!("failed to stat recording: {err}")))?;

        Ok(NewVoiceNote {
            uri: target.to_string_lossy().into_owned(),
            title: default_title(now.with_timezone(&Local)),
            duration: captured.duration_secs,
            date: iso_timestamp(now),
            size,
        })
    }

    /// Persists a stored recording; the file is removed when the catalog refuses it.
    async fn save_note(&self, note: NewVoiceNote) -> Result<VoiceNote> {
        match self.catalog.create(note.clone()).await {
            Ok(saved) => Ok(saved),
            Err(err) => {
                let path = audio_path(&note.uri);
                if let Err(cleanup) = tokio::fs::remove_file(&path).await {
                    warn!("Failed to remove unsaved recording {}: {cleanup}", path.display());
                }
                Err(err)
            }
        }
    }

    fn emit(&self, event: ControllerEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}
