//! View models for the note list, the rename form and the settings screen.
//! They hold display strings only; rendering is up to the front-end.

pub mod edit_form;
pub mod notes_list;
pub mod settings_screen;

pub use edit_form::EditNoteForm;
pub use notes_list::{
    format_date, format_duration, format_file_size, record_button_label, NoteListView, NoteRow,
};
pub use settings_screen::{OptionItem, SettingsScreen};
