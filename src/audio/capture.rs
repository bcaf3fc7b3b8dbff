use std::{
    fs::{self, File},
    io::{BufWriter, Seek, Write},
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicU64, Ordering},
        mpsc, Arc, Mutex,
    },
    thread::{self, JoinHandle},
};

use anyhow::{anyhow, bail, Context};
use cpal::{
    traits::{DeviceTrait, HostTrait, StreamTrait},
    Device, SampleFormat, SampleRate, Stream, SupportedStreamConfig,
};
use hound::{WavSpec, WavWriter};
use uuid::Uuid;

use super::{ActiveCapture, AudioRecorder, CapturePreset, CaptureSession, CapturedAudio};
use crate::{
    error::{Result, VoiceNoteError},
    log_error, log_info, log_warn,
    models::RecordingQuality,
};

const ENABLE_LOGS: bool = true;

type SharedWriter = Arc<Mutex<Option<WavWriter<BufWriter<File>>>>>;

/// First error hit by the stream callback, if any.
type WriteFailure = Arc<Mutex<Option<String>>>;

struct CaptureStats {
    samples: u64,
    channels: u16,
    sample_rate: u32,
    write_error: Option<String>,
}

/// Records from the default input device into 16-bit WAV files under `staging_dir`.
pub struct CpalRecorder {
    staging_dir: PathBuf,
}

impl CpalRecorder {
    pub fn new(staging_dir: PathBuf) -> Self {
        Self { staging_dir }
    }
}

impl AudioRecorder for CpalRecorder {
    fn start_capture(&self, quality: RecordingQuality) -> Result<CaptureSession> {
        fs::create_dir_all(&self.staging_dir).map_err(VoiceNoteError::capture)?;

        let path = self
            .staging_dir
            .join(format!("capture-{}.wav", Uuid::new_v4()));
        let preset = CapturePreset::from(quality);

        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let (ready_tx, ready_rx) = mpsc::channel::<anyhow::Result<()>>();
        let path_for_thread = path.clone();

        let worker = thread::Builder::new()
            .name("voicenotes-capture".into())
            .spawn(move || run_capture(path_for_thread, preset, ready_tx, stop_rx))
            .map_err(VoiceNoteError::capture)?;

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                let _ = worker.join();
                return Err(VoiceNoteError::Capture(format!("{err:#}")));
            }
            Err(_) => {
                let _ = worker.join();
                return Err(VoiceNoteError::capture(
                    "capture thread exited before signaling readiness",
                ));
            }
        }

        log_info!("Capture started ({}) into {}", quality.as_str(), path.display());

        Ok(CaptureSession::new(
            quality,
            Box::new(CpalCapture {
                path,
                stop_tx,
                worker: Some(worker),
            }),
        ))
    }
}

struct CpalCapture {
    path: PathBuf,
    stop_tx: mpsc::Sender<()>,
    worker: Option<JoinHandle<anyhow::Result<CaptureStats>>>,
}

impl CpalCapture {
    fn stop_worker(&mut self) -> anyhow::Result<CaptureStats> {
        let _ = self.stop_tx.send(());
        let worker = self
            .worker
            .take()
            .ok_or_else(|| anyhow!("capture worker already stopped"))?;
        worker
            .join()
            .map_err(|_| anyhow!("capture thread panicked"))?
    }
}

impl ActiveCapture for CpalCapture {
    fn finish(mut self: Box<Self>) -> Result<CapturedAudio> {
        let stats = self
            .stop_worker()
            .map_err(|err| VoiceNoteError::Capture(format!("{err:#}")))?;

        if let Some(write_error) = stats.write_error {
            if let Err(err) = fs::remove_file(&self.path) {
                log_warn!("Failed to remove truncated capture {}: {err}", self.path.display());
            }
            return Err(VoiceNoteError::Capture(format!(
                "recording was interrupted: {write_error}"
            )));
        }

        if !self.path.exists() {
            return Err(VoiceNoteError::Capture(format!(
                "recording file {} is missing",
                self.path.display()
            )));
        }

        let frames = stats.samples / u64::from(stats.channels.max(1));
        let duration_secs = (frames as f64 / f64::from(stats.sample_rate.max(1))).round() as u64;
        log_info!(
            "Capture finished: {} frames, {}s at {} Hz",
            frames,
            duration_secs,
            stats.sample_rate
        );

        Ok(CapturedAudio {
            path: self.path.clone(),
            duration_secs,
            extension: "wav".into(),
        })
    }

    fn abort(mut self: Box<Self>) {
        if let Err(err) = self.stop_worker() {
            log_warn!("Capture worker ended with error during abort: {err:#}");
        }
        if let Err(err) = fs::remove_file(&self.path) {
            log_warn!("Failed to remove aborted capture {}: {err}", self.path.display());
        }
    }
}

fn run_capture(
    path: PathBuf,
    preset: CapturePreset,
    ready_tx: mpsc::Sender<anyhow::Result<()>>,
    stop_rx: mpsc::Receiver<()>,
) -> anyhow::Result<CaptureStats> {
    let started = open_stream(&path, preset);
    let (stream, writer, samples, failure, spec) = match started {
        Ok(parts) => {
            let _ = ready_tx.send(Ok(()));
            parts
        }
        Err(err) => {
            let _ = ready_tx.send(Err(err));
            let _ = fs::remove_file(&path);
            bail!("capture did not start");
        }
    };

    // Blocks until the session is finished or aborted (sender dropped).
    let _ = stop_rx.recv();
    drop(stream);

    let writer = writer
        .lock()
        .map_err(|_| anyhow!("capture writer lock poisoned"))?
        .take();
    if let Some(writer) = writer {
        writer.finalize().context("failed to finalize WAV file")?;
    }

    let write_error = match failure.lock() {
        Ok(mut guard) => guard.take(),
        Err(poisoned) => poisoned.into_inner().take(),
    };

    Ok(CaptureStats {
        samples: samples.load(Ordering::SeqCst),
        channels: spec.channels,
        sample_rate: spec.sample_rate,
        write_error,
    })
}

fn open_stream(
    path: &Path,
    preset: CapturePreset,
) -> anyhow::Result<(Stream, SharedWriter, Arc<AtomicU64>, WriteFailure, WavSpec)> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| anyhow!("no input device available"))?;
    let config = pick_config(&device, preset)?;

    let spec = WavSpec {
        channels: config.channels(),
        sample_rate: config.sample_rate().0,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let writer = WavWriter::create(path, spec)
        .with_context(|| format!("failed to create {}", path.display()))?;
    let writer: SharedWriter = Arc::new(Mutex::new(Some(writer)));
    let samples = Arc::new(AtomicU64::new(0));
    let failure: WriteFailure = Arc::new(Mutex::new(None));

    let stream = build_stream(
        &device,
        &config,
        writer.clone(),
        samples.clone(),
        failure.clone(),
    )?;
    stream.play().context("failed to start input stream")?;

    Ok((stream, writer, samples, failure, spec))
}

/// Prefers a device configuration matching the preset, otherwise the device default.
fn pick_config(device: &Device, preset: CapturePreset) -> anyhow::Result<SupportedStreamConfig> {
    let wanted = SampleRate(preset.sample_rate);
    if let Ok(ranges) = device.supported_input_configs() {
        for range in ranges {
            let usable_format = matches!(
                range.sample_format(),
                SampleFormat::F32 | SampleFormat::I16 | SampleFormat::I32
            );
            if usable_format
                && range.channels() == preset.channels
                && range.min_sample_rate() <= wanted
                && wanted <= range.max_sample_rate()
            {
                return Ok(range.with_sample_rate(wanted));
            }
        }
    }

    log_warn!(
        "No input config for {} Hz / {} ch; using device default",
        preset.sample_rate,
        preset.channels
    );
    device
        .default_input_config()
        .context("no usable input configuration")
}

fn build_stream(
    device: &Device,
    config: &SupportedStreamConfig,
    writer: SharedWriter,
    samples: Arc<AtomicU64>,
    failure: WriteFailure,
) -> anyhow::Result<Stream> {
    let stream_config = config.config();
    let on_error = |err: cpal::StreamError| {
        log_error!("Input stream error: {err}");
    };

    let stream = match config.sample_format() {
        SampleFormat::F32 => device.build_input_stream(
            &stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                write_samples(
                    &*writer,
                    &samples,
                    &failure,
                    data.iter()
                        .map(|s| (s.clamp(-1.0, 1.0) * f32::from(i16::MAX)) as i16),
                );
            },
            on_error,
            None,
        )?,
        SampleFormat::I16 => device.build_input_stream(
            &stream_config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                write_samples(&*writer, &samples, &failure, data.iter().copied());
            },
            on_error,
            None,
        )?,
        SampleFormat::I32 => device.build_input_stream(
            &stream_config,
            move |data: &[i32], _: &cpal::InputCallbackInfo| {
                write_samples(
                    &*writer,
                    &samples,
                    &failure,
                    data.iter().map(|s| (s >> 16) as i16),
                );
            },
            on_error,
            None,
        )?,
        other => bail!("unsupported sample format {other:?}"),
    };

    Ok(stream)
}

fn write_samples<W: Write + Seek>(
    writer: &Mutex<Option<WavWriter<W>>>,
    written: &AtomicU64,
    failure: &Mutex<Option<String>>,
    data: impl Iterator<Item = i16>,
) {
    let mut guard = match writer.lock() {
        Ok(guard) => guard,
        Err(_) => {
            record_failure(failure, "WAV writer lock poisoned".into());
            return;
        }
    };
    let Some(writer) = guard.as_mut() else {
        return;
    };

    let mut count = 0u64;
    for sample in data {
        if let Err(err) = writer.write_sample(sample) {
            record_failure(failure, format!("failed to write samples: {err}"));
            // Nothing more can be appended once the file is out of step.
            guard.take();
            break;
        }
        count += 1;
    }
    written.fetch_add(count, Ordering::Relaxed);
}

/// Keeps the first failure; later ones are only logged.
fn record_failure(failure: &Mutex<Option<String>>, message: String) {
    log_error!("Capture write failed: {message}");
    let mut slot = match failure.lock() {
        Ok(slot) => slot,
        Err(poisoned) => poisoned.into_inner(),
    };
    if slot.is_none() {
        *slot = Some(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{self, Cursor, SeekFrom};

    /// Accepts `limit` bytes, then fails every write.
    struct FullDisk {
        inner: Cursor<Vec<u8>>,
        limit: u64,
    }

    impl Write for FullDisk {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.inner.position() + buf.len() as u64 > self.limit {
                return Err(io::Error::new(io::ErrorKind::Other, "no space left on device"));
            }
            self.inner.write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Seek for FullDisk {
        fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
            self.inner.seek(pos)
        }
    }

    fn mono_spec() -> WavSpec {
        WavSpec {
            channels: 1,
            sample_rate: 16_000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        }
    }

    #[test]
    fn failed_write_is_recorded_and_stops_writing() {
        let sink = FullDisk {
            inner: Cursor::new(Vec::new()),
            limit: 44 + 4,
        };
        let writer = Mutex::new(Some(WavWriter::new(sink, mono_spec()).unwrap()));
        let written = AtomicU64::new(0);
        let failure = Mutex::new(None);

        write_samples(&writer, &written, &failure, [1i16, 2, 3, 4].into_iter());

        assert_eq!(written.load(Ordering::SeqCst), 2);
        let message = failure.lock().unwrap().clone().unwrap();
        assert!(message.contains("no space left"), "{message}");
        assert!(writer.lock().unwrap().is_none());

        write_samples(&writer, &written, &failure, [5i16].into_iter());
        assert_eq!(written.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn first_failure_wins() {
        let failure = Mutex::new(None);
        record_failure(&failure, "first".into());
        record_failure(&failure, "second".into());
        assert_eq!(failure.lock().unwrap().as_deref(), Some("first"));
    }

    #[test]
    fn healthy_writer_counts_samples() {
        let writer = Mutex::new(Some(
            WavWriter::new(Cursor::new(Vec::new()), mono_spec()).unwrap(),
        ));
        let written = AtomicU64::new(0);
        let failure = Mutex::new(None);

        write_samples(&writer, &written, &failure, (0..10i16).into_iter());
        assert_eq!(written.load(Ordering::SeqCst), 10);
        assert!(failure.lock().unwrap().is_none());
    }
}
