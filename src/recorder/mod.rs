pub mod controller;
pub mod state;

pub use controller::{AudioBackends, ControllerEvent, RecordingOutcome, VoiceNoteController};
pub use state::{PlaybackState, RecorderState, RecorderStatus};
