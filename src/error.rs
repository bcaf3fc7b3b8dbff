use thiserror::Error;

/// Failures surfaced by the catalog, settings, audio and controller layers.
///
/// Storage plumbing works in `anyhow::Result`; those chains are wrapped in
/// [`VoiceNoteError::Persistence`] at the store boundary.
#[derive(Debug, Error)]
pub enum VoiceNoteError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("capture failed: {0}")]
    Capture(String),

    #[error("playback failed: {0}")]
    Playback(String),

    #[error("persistence failed: {0:#}")]
    Persistence(anyhow::Error),

    #[error("voice note {0} not found")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl VoiceNoteError {
    pub fn capture(err: impl std::fmt::Display) -> Self {
        Self::Capture(err.to_string())
    }

    pub fn playback(err: impl std::fmt::Display) -> Self {
        Self::Playback(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, VoiceNoteError>;

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn persistence_message_keeps_context_chain() {
        let inner: anyhow::Result<()> = Err(anyhow::anyhow!("disk full"));
        let err = VoiceNoteError::Persistence(inner.context("failed to write @voice_notes").unwrap_err());
        assert_eq!(
            err.to_string(),
            "persistence failed: failed to write @voice_notes: disk full"
        );
    }

    #[test]
    fn not_found_names_the_id() {
        assert_eq!(
            VoiceNoteError::NotFound("42".into()).to_string(),
            "voice note 42 not found"
        );
    }
}
