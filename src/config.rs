use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{info, warn};

const APP_DIR_NAME: &str = "voicenotes";
const DB_FILE_NAME: &str = "voicenotes.sqlite3";
const RECORDINGS_DIR_NAME: &str = "recordings";
const STAGING_DIR_NAME: &str = "staging";

/// Where the application keeps its database and audio files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    data_dir: PathBuf,
}

impl AppConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Uses `data_dir` when given, otherwise the platform data directory.
    pub fn resolve(data_dir: Option<PathBuf>) -> Self {
        Self::new(data_dir.unwrap_or_else(default_data_dir))
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join(DB_FILE_NAME)
    }

    /// Final home of saved recordings.
    pub fn recordings_dir(&self) -> PathBuf {
        self.data_dir.join(RECORDINGS_DIR_NAME)
    }

    /// Scratch space for captures that have not been stopped yet.
    pub fn staging_dir(&self) -> PathBuf {
        self.data_dir.join(STAGING_DIR_NAME)
    }

    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [self.recordings_dir(), self.staging_dir()] {
            if !dir.exists() {
                std::fs::create_dir_all(&dir)
                    .with_context(|| format!("failed to create {}", dir.display()))?;
                info!("Created directory {}", dir.display());
            }
        }
        Ok(())
    }

    /// Removes captures left behind by a run that never stopped its recording.
    pub fn clear_staging(&self) -> Result<usize> {
        let staging = self.staging_dir();
        if !staging.exists() {
            return Ok(0);
        }

        let mut removed = 0;
        for entry in std::fs::read_dir(&staging)
            .with_context(|| format!("failed to list {}", staging.display()))?
        {
            let path = entry?.path();
            if path.is_file() {
                match std::fs::remove_file(&path) {
                    Ok(()) => removed += 1,
                    Err(err) => warn!("Failed to remove stale capture {}: {err}", path.display()),
                }
            }
        }
        Ok(removed)
    }
}

pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR_NAME)
}

/// `recording-<epoch-millis>.<extension>`
pub fn recording_file_name(epoch_millis: i64, extension: &str) -> String {
    format!("recording-{epoch_millis}.{extension}")
}
