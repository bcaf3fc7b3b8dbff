use std::{
    fs::File,
    io::BufReader,
    path::{Path, PathBuf},
    sync::{
        mpsc::{self, Sender},
        Arc, Mutex,
    },
    thread,
    time::Duration,
};

use rodio::{Decoder, OutputStream, Sink};

use super::{ActivePlayback, AudioPlayer, PlaybackHandle};
use crate::{
    error::{Result, VoiceNoteError},
    log_info, log_warn,
};

const ENABLE_LOGS: bool = true;

enum PlayerCommand {
    Play {
        path: PathBuf,
        rate: f32,
        reply: Sender<std::result::Result<u64, String>>,
    },
    Stop {
        generation: u64,
    },
    IsFinished {
        generation: u64,
        reply: Sender<bool>,
    },
}

/// Plays audio files through the default output device on a dedicated thread.
///
/// Each successful `play` gets a new generation number so a stale handle can
/// never stop a newer sound.
pub struct RodioPlayer {
    tx: Arc<Mutex<Option<Sender<PlayerCommand>>>>,
}

impl Default for RodioPlayer {
    fn default() -> Self {
        Self::new()
    }
}

impl RodioPlayer {
    pub fn new() -> Self {
        Self {
            tx: Arc::new(Mutex::new(None)),
        }
    }

    fn ensure_thread(&self) -> std::result::Result<Sender<PlayerCommand>, String> {
        let mut guard = self.tx.lock().map_err(|e| e.to_string())?;
        if let Some(tx) = guard.as_ref() {
            return Ok(tx.clone());
        }

        let (tx, rx) = mpsc::channel::<PlayerCommand>();

        // Spawn dedicated audio thread holding non-Send audio objects
        thread::Builder::new()
            .name("voicenotes-playback".to_string())
            .spawn(move || {
                let mut _stream: Option<OutputStream> = None;
                let mut sink: Option<Sink> = None;
                let mut current: u64 = 0;

                fn open_sink(
                    stream: &mut Option<OutputStream>,
                    sink: &mut Option<Sink>,
                ) -> std::result::Result<(), String> {
                    let (s, handle) = OutputStream::try_default()
                        .map_err(|e| format!("Failed to create audio output stream: {}", e))?;
                    let new_sink = Sink::try_new(&handle)
                        .map_err(|e| format!("Failed to create audio sink: {}", e))?;
                    *stream = Some(s);
                    *sink = Some(new_sink);
                    Ok(())
                }

                fn load(path: &Path) -> std::result::Result<Decoder<BufReader<File>>, String> {
                    let file = File::open(path)
                        .map_err(|e| format!("Cannot open {}: {}", path.display(), e))?;
                    Decoder::new(BufReader::new(file))
                        .map_err(|e| format!("Cannot decode {}: {}", path.display(), e))
                }

                while let Ok(cmd) = rx.recv() {
                    match cmd {
                        PlayerCommand::Play { path, rate, reply } => {
                            // Unload whatever was playing before
                            if let Some(old) = sink.take() {
                                old.stop();
                            }
                            _stream = None;

                            let result = load(&path).and_then(|source| {
                                open_sink(&mut _stream, &mut sink)?;
                                let s = sink
                                    .as_ref()
                                    .ok_or_else(|| "Audio sink unavailable".to_string())?;
                                s.set_speed(rate);
                                s.append(source);
                                s.play();
                                current += 1;
                                Ok(current)
                            });

                            if result.is_err() {
                                sink = None;
                                _stream = None;
                            }
                            let _ = reply.send(result);
                        }
                        PlayerCommand::Stop { generation } => {
                            if generation == current {
                                if let Some(old) = sink.take() {
                                    old.stop();
                                }
                                _stream = None;
                            }
                        }
                        PlayerCommand::IsFinished { generation, reply } => {
                            let finished = generation != current
                                || sink.as_ref().map_or(true, |s| s.empty());
                            let _ = reply.send(finished);
                        }
                    }
                }
            })
            .map_err(|e| e.to_string())?;

        *guard = Some(tx.clone());
        Ok(tx)
    }
}

impl AudioPlayer for RodioPlayer {
    fn play(&self, path: &Path, rate: f32) -> Result<PlaybackHandle> {
        if !path.exists() {
            return Err(VoiceNoteError::Playback(format!(
                "{} does not exist",
                path.display()
            )));
        }

        let tx = self.ensure_thread().map_err(VoiceNoteError::Playback)?;
        let (reply_tx, reply_rx) = mpsc::channel();
        tx.send(PlayerCommand::Play {
            path: path.to_path_buf(),
            rate,
            reply: reply_tx,
        })
        .map_err(VoiceNoteError::playback)?;

        let generation = reply_rx
            .recv()
            .map_err(|_| VoiceNoteError::playback("playback thread terminated unexpectedly"))?
            .map_err(VoiceNoteError::Playback)?;

        log_info!("Playing {} at {}x", path.display(), rate);

        Ok(PlaybackHandle::new(
            path.to_path_buf(),
            rate,
            Box::new(RodioPlayback { tx, generation }),
        ))
    }
}

struct RodioPlayback {
    tx: Sender<PlayerCommand>,
    generation: u64,
}

impl ActivePlayback for RodioPlayback {
    fn is_finished(&self) -> bool {
        let (reply_tx, reply_rx) = mpsc::channel();
        if self
            .tx
            .send(PlayerCommand::IsFinished {
                generation: self.generation,
                reply: reply_tx,
            })
            .is_err()
        {
            return true;
        }
        reply_rx
            .recv_timeout(Duration::from_secs(1))
            .unwrap_or(true)
    }

    fn stop(self: Box<Self>) {
        if self
            .tx
            .send(PlayerCommand::Stop {
                generation: self.generation,
            })
            .is_err()
        {
            log_warn!("Playback thread gone before stop");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_a_playback_error() {
        let player = RodioPlayer::new();
        let err = player
            .play(Path::new("/definitely/not/here.wav"), 1.0)
            .err()
            .unwrap();
        assert!(matches!(err, VoiceNoteError::Playback(_)));
    }
}
