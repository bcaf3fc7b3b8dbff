use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, OptionalExtension};

use crate::db::{Database, KeyValueStore};

impl Database {
    /// Read the raw value stored under `key`
    pub async fn get_item(&self, key: &str) -> Result<Option<String>> {
        let key = key.to_string();
        self.execute(move |conn| {
            conn.query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                params![key],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .with_context(|| format!("failed to read {key}"))
        })
        .await
    }

    /// Insert or overwrite the value stored under `key`
    pub async fn set_item(&self, key: &str, value: String) -> Result<()> {
        let key = key.to_string();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO kv_store (key, value, updated_at)
                 VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET
                     value = excluded.value,
                     updated_at = excluded.updated_at",
                params![key, value, Utc::now().to_rfc3339()],
            )
            .with_context(|| format!("failed to write {key}"))?;
            Ok(())
        })
        .await
    }

    pub async fn remove_item(&self, key: &str) -> Result<()> {
        let key = key.to_string();
        self.execute(move |conn| {
            conn.execute("DELETE FROM kv_store WHERE key = ?1", params![key])
                .with_context(|| format!("failed to remove {key}"))?;
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl KeyValueStore for Database {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        Database::get_item(self, key).await
    }

    async fn set_item(&self, key: &str, value: String) -> Result<()> {
        Database::set_item(self, key, value).await
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        Database::remove_item(self, key).await
    }
}

#[cfg(test)]
mod tests {
    use crate::db::{Database, VOICE_NOTES_KEY};

    #[tokio::test]
    async fn values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("voicenotes.sqlite3");

        {
            let db = Database::new(path.clone()).unwrap();
            assert_eq!(db.get_item(VOICE_NOTES_KEY).await.unwrap(), None);
            db.set_item(VOICE_NOTES_KEY, "[]".into()).await.unwrap();
            db.set_item(VOICE_NOTES_KEY, "[1]".into()).await.unwrap();
        }

        let db = Database::new(path).unwrap();
        assert_eq!(
            db.get_item(VOICE_NOTES_KEY).await.unwrap().as_deref(),
            Some("[1]")
        );

        db.remove_item(VOICE_NOTES_KEY).await.unwrap();
        assert_eq!(db.get_item(VOICE_NOTES_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn creates_missing_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("voicenotes.sqlite3");
        let db = Database::new(path.clone()).unwrap();
        assert_eq!(db.path(), path.as_path());
        assert!(path.exists());
    }
}
