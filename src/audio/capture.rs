//! Live microphone capture via `cpal` (feature `microphone`).
//!
//! `cpal::Stream` is not `Send` on every platform, so the stream is built and
//! owned by a dedicated `voice-capture` thread.  [`Microphone`] only holds the
//! channel used to stop that thread and the shared [`RecordingBuffer`] the
//! cpal callback fills, which keeps it `Send` and usable as a
//! `Box<dyn AudioInput>`.
//!
//! Opening and closing the device are synchronous handshakes with that
//! thread (`start` waits for the stream to report ready, `stop`/`abort`
//! join the thread).  On a multi-threaded tokio runtime both run inside
//! [`tokio::task::block_in_place`] so the calling worker hands its other
//! tasks off while the device opens or closes.

use std::sync::{mpsc, Arc, Mutex, PoisonError};
use std::thread::JoinHandle;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use crate::audio::buffer::RecordingBuffer;
use crate::audio::input::{AudioClip, AudioError, AudioInput};

type SharedBuffer = Arc<Mutex<RecordingBuffer>>;

struct ActiveCapture {
    buffer: SharedBuffer,
    stop_tx: mpsc::Sender<()>,
    thread: JoinHandle<()>,
    sample_rate: u32,
    channels: u16,
}

/// The system default input device.
///
/// Each `start` opens a fresh stream; samples beyond `max_recording_secs`
/// are dropped (the orchestrator stops the session at the same deadline).
pub struct Microphone {
    max_recording_secs: f32,
    active: Option<ActiveCapture>,
}

impl Microphone {
    pub fn new(max_recording_secs: f32) -> Self {
        Self {
            max_recording_secs,
            active: None,
        }
    }

    /// Stop the capture thread and hand back its buffer.
    fn shutdown(active: ActiveCapture) -> (Vec<f32>, u32, u16) {
        let _ = active.stop_tx.send(());
        if blocking(|| active.thread.join()).is_err() {
            log::error!("voice-capture thread panicked");
        }
        let samples = active
            .buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        (samples, active.sample_rate, active.channels)
    }
}

type Ready = Result<(SharedBuffer, u32, u16), AudioError>;

/// Run a blocking device handshake without stalling a tokio worker.
///
/// `block_in_place` is only allowed on the multi-threaded runtime; on a
/// current-thread runtime or outside tokio `f` runs inline.
fn blocking<T>(f: impl FnOnce() -> T) -> T {
    use tokio::runtime::{Handle, RuntimeFlavor};

    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(f)
        }
        _ => f(),
    }
}

/// Body of the `voice-capture` thread: open the stream, report readiness,
/// then keep the stream alive until told to stop.
fn run_stream(max_secs: f32, ready_tx: mpsc::Sender<Ready>, stop_rx: mpsc::Receiver<()>) {
    let host = cpal::default_host();
    let Some(device) = host.default_input_device() else {
        let _ = ready_tx.send(Err(AudioError::NoDevice));
        return;
    };
    let supported = match device.default_input_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            let _ = ready_tx.send(Err(AudioError::Stream(e.to_string())));
            return;
        }
    };

    let sample_rate = supported.sample_rate().0;
    let channels = supported.channels();
    let config: cpal::StreamConfig = supported.into();

    let recording = RecordingBuffer::for_duration(max_secs, sample_rate, channels);
    log::debug!("microphone: buffer holds {} samples", recording.capacity());
    let buffer: SharedBuffer = Arc::new(Mutex::new(recording));
    let sink = Arc::clone(&buffer);
    let mut reported_full = false;

    let stream = device.build_input_stream(
        &config,
        move |data: &[f32], _: &cpal::InputCallbackInfo| {
            let mut buf = sink.lock().unwrap_or_else(PoisonError::into_inner);
            if buf.is_full() {
                if !reported_full {
                    log::debug!("microphone: recording cap reached, dropping input");
                    reported_full = true;
                }
                return;
            }
            buf.push_slice(data);
        },
        |err: cpal::StreamError| {
            log::error!("cpal stream error: {err}");
        },
        None,
    );

    let stream = match stream {
        Ok(s) => s,
        Err(e) => {
            let _ = ready_tx.send(Err(AudioError::Stream(e.to_string())));
            return;
        }
    };
    if let Err(e) = stream.play() {
        let _ = ready_tx.send(Err(AudioError::Stream(e.to_string())));
        return;
    }

    let _ = ready_tx.send(Ok((buffer, sample_rate, channels)));

    // Either an explicit stop or the Microphone being dropped ends capture.
    let _ = stop_rx.recv();
    drop(stream);
}

impl AudioInput for Microphone {
    fn start(&mut self) -> Result<(), AudioError> {
        if self.active.is_some() {
            return Err(AudioError::AlreadyRecording);
        }

        let (ready_tx, ready_rx) = mpsc::channel::<Ready>();
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let max_secs = self.max_recording_secs;

        let thread = std::thread::Builder::new()
            .name("voice-capture".into())
            .spawn(move || run_stream(max_secs, ready_tx, stop_rx))
            .map_err(|e| AudioError::Stream(e.to_string()))?;

        let (buffer, sample_rate, channels) = match blocking(|| ready_rx.recv()) {
            Ok(Ok(ready)) => ready,
            Ok(Err(e)) => {
                let _ = blocking(|| thread.join());
                return Err(e);
            }
            Err(_) => {
                let _ = blocking(|| thread.join());
                return Err(AudioError::Stream("capture thread exited early".into()));
            }
        };

        log::debug!("microphone: capturing at {sample_rate} Hz, {channels} ch");
        self.active = Some(ActiveCapture {
            buffer,
            stop_tx,
            thread,
            sample_rate,
            channels,
        });
        Ok(())
    }

    fn stop(&mut self) -> Result<AudioClip, AudioError> {
        let active = self.active.take().ok_or(AudioError::NotRecording)?;
        let (samples, sample_rate, channels) = Self::shutdown(active);
        Ok(AudioClip {
            samples,
            sample_rate,
            channels,
        })
    }

    fn abort(&mut self) {
        if let Some(active) = self.active.take() {
            let _ = Self::shutdown(active);
        }
    }
}

impl Drop for Microphone {
    fn drop(&mut self) {
        self.abort();
    }
}
