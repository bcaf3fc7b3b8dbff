//! User actions as plain functions returning `Result<T, String>`, ready to be
//! bound to any front-end.

use crate::{
    models::{AppSettings, SettingsChange, VoiceNote},
    presentation::{NoteListView, SettingsScreen},
    recorder::{PlaybackState, RecorderState, RecordingOutcome},
    AppState,
};

pub async fn start_recording(state: &AppState) -> Result<RecorderState, String> {
    state
        .controller
        .start_recording()
        .await
        .map_err(|e| e.to_string())
}

pub async fn stop_recording(state: &AppState) -> Result<RecordingOutcome, String> {
    state
        .controller
        .stop_recording()
        .await
        .map_err(|e| e.to_string())
}

pub async fn save_pending_recording(
    state: &AppState,
    title: Option<String>,
) -> Result<VoiceNote, String> {
    state
        .controller
        .save_pending(title)
        .await
        .map_err(|e| e.to_string())
}

pub async fn discard_pending_recording(state: &AppState) -> Result<bool, String> {
    state
        .controller
        .discard_pending()
        .await
        .map_err(|e| e.to_string())
}

pub async fn get_recorder_state(state: &AppState) -> Result<RecorderState, String> {
    Ok(state.controller.recorder_state().await)
}

pub async fn list_notes(state: &AppState, query: Option<String>) -> Result<NoteListView, String> {
    let query = query.unwrap_or_default();
    let notes = state.catalog.list().await;
    Ok(NoteListView::build(&notes, &query))
}

pub async fn get_note(state: &AppState, id: String) -> Result<VoiceNote, String> {
    state
        .catalog
        .get(&id)
        .await
        .ok_or_else(|| format!("voice note {id} not found"))
}

pub async fn play_note(state: &AppState, id: String) -> Result<PlaybackState, String> {
    state
        .controller
        .play_note(&id)
        .await
        .map_err(|e| e.to_string())
}

pub async fn stop_playback(state: &AppState) -> Result<bool, String> {
    Ok(state.controller.stop_playback().await)
}

pub async fn get_playback_state(state: &AppState) -> Result<PlaybackState, String> {
    Ok(state.controller.playback_state().await)
}

pub async fn rename_note(state: &AppState, id: String, title: String) -> Result<VoiceNote, String> {
    state
        .controller
        .rename_note(&id, &title)
        .await
        .map_err(|e| e.to_string())
}

pub async fn delete_note(state: &AppState, id: String) -> Result<bool, String> {
    state
        .controller
        .delete_note(&id)
        .await
        .map_err(|e| e.to_string())
}

pub async fn get_settings(state: &AppState) -> Result<SettingsScreen, String> {
    Ok(SettingsScreen::new(state.controller.settings().await))
}

pub async fn update_setting(
    state: &AppState,
    field: String,
    value: String,
) -> Result<AppSettings, String> {
    let change = SettingsChange::parse(&field, &value)?;
    state
        .controller
        .update_setting(change)
        .await
        .map_err(|e| e.to_string())
}
