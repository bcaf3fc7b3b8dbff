use crate::{
    error::{Result, VoiceNoteError},
    models::VoiceNote,
};

/// Rename dialog state for a single note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditNoteForm {
    note_id: String,
    original_title: String,
    title: String,
}

impl EditNoteForm {
    pub fn open(note: &VoiceNote) -> Self {
        Self {
            note_id: note.id.clone(),
            original_title: note.title.clone(),
            title: note.title.clone(),
        }
    }

    pub fn note_id(&self) -> &str {
        &self.note_id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn is_dirty(&self) -> bool {
        self.title.trim() != self.original_title.trim()
    }

    /// The trimmed title, or `InvalidInput` when nothing is left.
    pub fn validated_title(&self) -> Result<String> {
        let trimmed = self.title.trim();
        if trimmed.is_empty() {
            return Err(VoiceNoteError::InvalidInput("title must not be empty".into()));
        }
        Ok(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note() -> VoiceNote {
        VoiceNote {
            id: "17".into(),
            uri: "/tmp/recording-17.wav".into(),
            title: "Recording 1".into(),
            duration: 3,
            date: "2024-03-01T09:15:00.000Z".into(),
            size: 10,
        }
    }

    #[test]
    fn trims_and_tracks_changes() {
        let mut form = EditNoteForm::open(&note());
        assert!(!form.is_dirty());

        form.set_title("  Meeting notes ");
        assert!(form.is_dirty());
        assert_eq!(form.validated_title().unwrap(), "Meeting notes");
        assert_eq!(form.note_id(), "17");
    }

    #[test]
    fn rejects_blank_title() {
        let mut form = EditNoteForm::open(&note());
        form.set_title("   ");
        assert!(matches!(
            form.validated_title(),
            Err(VoiceNoteError::InvalidInput(_))
        ));
    }
}
