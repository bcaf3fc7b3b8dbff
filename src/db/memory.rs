use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::Mutex;

use super::KeyValueStore;

/// Process-local store; nothing survives a restart.
#[derive(Default)]
pub struct MemoryStore {
    items: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.items.lock().await.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: String) -> Result<()> {
        self.items.lock().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove_item(&self, key: &str) -> Result<()> {
        self.items.lock().await.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn set_get_remove() {
        let store = MemoryStore::new();
        assert_eq!(store.get_item("@voice_notes").await.unwrap(), None);

        store.set_item("@voice_notes", "[]".into()).await.unwrap();
        assert_eq!(
            store.get_item("@voice_notes").await.unwrap().as_deref(),
            Some("[]")
        );

        store.remove_item("@voice_notes").await.unwrap();
        assert_eq!(store.get_item("@voice_notes").await.unwrap(), None);
    }
}
