use std::sync::Arc;

use anyhow::Context;
use log::warn;

use crate::{
    db::{KeyValueStore, APP_SETTINGS_KEY},
    error::{Result, VoiceNoteError},
    models::AppSettings,
};

/// Persists the single [`AppSettings`] record. Merging individual changes is
/// the caller's job; `set` always overwrites the whole record.
pub struct SettingsStore {
    store: Arc<dyn KeyValueStore>,
}

impl SettingsStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// `None` until settings have been saved once, or when the stored record
    /// cannot be read back.
    pub async fn get(&self) -> Option<AppSettings> {
        let raw = match self.store.get_item(APP_SETTINGS_KEY).await {
            Ok(raw) => raw?,
            Err(err) => {
                warn!("Failed to read settings: {err:#}");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(settings) => Some(settings),
            Err(err) => {
                warn!("Ignoring unreadable settings record: {err}");
                None
            }
        }
    }

    pub async fn get_or_default(&self) -> AppSettings {
        self.get().await.unwrap_or_default()
    }

    pub async fn set(&self, settings: &AppSettings) -> Result<()> {
        let serialized = serde_json::to_string(settings)
            .context("failed to serialize settings")
            .map_err(VoiceNoteError::Persistence)?;

        self.store
            .set_item(APP_SETTINGS_KEY, serialized)
            .await
            .context("failed to write settings")
            .map_err(VoiceNoteError::Persistence)
    }
}
