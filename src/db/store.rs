use anyhow::Result;
use async_trait::async_trait;

/// Key holding the JSON array of voice notes.
pub const VOICE_NOTES_KEY: &str = "@voice_notes";
/// Key holding the JSON settings object.
pub const APP_SETTINGS_KEY: &str = "@app_settings";

/// String-to-string persistence used by the catalog and settings stores.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get_item(&self, key: &str) -> Result<Option<String>>;

    async fn set_item(&self, key: &str, value: String) -> Result<()>;

    async fn remove_item(&self, key: &str) -> Result<()>;
}
