use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::debug;

use crate::config::recording_file_name;

/// Moves `from` to `to`, falling back to copy + delete across filesystems.
pub async fn move_file(from: &Path, to: &Path) -> Result<()> {
    if let Some(parent) = to.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    if let Err(err) = tokio::fs::rename(from, to).await {
        debug!(
            "rename {} -> {} failed ({err}); copying instead",
            from.display(),
            to.display()
        );
        tokio::fs::copy(from, to)
            .await
            .with_context(|| format!("failed to copy {} to {}", from.display(), to.display()))?;
        tokio::fs::remove_file(from)
            .await
            .with_context(|| format!("failed to remove {}", from.display()))?;
    }

    Ok(())
}

/// First free `recording-<millis>.<ext>` path in `dir`, starting at `epoch_millis`.
pub async fn unique_recording_path(dir: &Path, epoch_millis: i64, extension: &str) -> PathBuf {
    let mut millis = epoch_millis;
    loop {
        let candidate = dir.join(recording_file_name(millis, extension));
        if !tokio::fs::try_exists(&candidate).await.unwrap_or(false) {
            return candidate;
        }
        millis += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn move_file_creates_target_directory() {
        let dir = tempfile::tempdir().unwrap();
        let from = dir.path().join("capture.wav");
        let to = dir.path().join("recordings").join("recording-1.wav");
        std::fs::write(&from, b"RIFF").unwrap();

        move_file(&from, &to).await.unwrap();
        assert!(!from.exists());
        assert_eq!(std::fs::read(&to).unwrap(), b"RIFF");
    }

    #[tokio::test]
    async fn unique_path_skips_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("recording-5.wav"), b"").unwrap();

        let path = unique_recording_path(dir.path(), 5, "wav").await;
        assert_eq!(path, dir.path().join("recording-6.wav"));
    }
}
