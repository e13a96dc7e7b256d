//! Camera capture: device acquisition, recorder lifetime and chunk buffering.
//!
//! The platform pieces sit behind three small traits so the session logic
//! never touches a real camera. `MediaCaptureManager` owns the ordering
//! rules: chunks are appended in delivery order, empty chunks are dropped,
//! and the device is released on every stop path. Stopping never waits on
//! the recorder: the payload is assembled by `PendingRecording` with a
//! bounded wait.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use crate::app::SessionEvent;

/// Container format for everything recorded from the camera.
pub const RECORDING_MIME: &str = "video/webm";
pub const RECORDING_FILE_NAME: &str = "recorded.webm";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error("access denied: {0}")]
    Denied(String),
    #[error("device unavailable: {0}")]
    Unavailable(String),
    #[error("recorder error: {0}")]
    Recorder(String),
}

/// An immutable, named video blob ready to be analyzed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaPayload {
    name: String,
    mime: String,
    data: Arc<[u8]>,
}

impl MediaPayload {
    pub fn new(name: impl Into<String>, mime: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            mime: mime.into(),
            data: data.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Events a recorder delivers while it runs. `Stopped` is sent once, after
/// the last chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecorderEvent {
    Chunk(Vec<u8>),
    Stopped,
}

/// The live output of a capture device, as seen by a preview surface.
///
/// Cloning shares the underlying counters. Releasing the device flips
/// `is_live` to false for every clone.
#[derive(Debug, Clone)]
pub struct LiveFeed {
    label: Arc<str>,
    live: Arc<AtomicBool>,
    bytes: Arc<AtomicU64>,
}

impl LiveFeed {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.into(),
            live: Arc::new(AtomicBool::new(true)),
            bytes: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }

    pub fn bytes_captured(&self) -> u64 {
        self.bytes.load(Ordering::Relaxed)
    }

    pub fn revoke(&self) {
        self.live.store(false, Ordering::Release);
    }

    fn add_bytes(&self, n: usize) {
        self.bytes.fetch_add(n as u64, Ordering::Relaxed);
    }

    /// True when both handles point at the same device output.
    pub fn same_source(&self, other: &LiveFeed) -> bool {
        Arc::ptr_eq(&self.live, &other.live)
    }
}

/// Platform capability that hands out camera devices.
#[async_trait(?Send)]
pub trait CaptureBackend {
    async fn acquire(&self) -> Result<Box<dyn CaptureDevice>, CaptureError>;
}

/// An acquired camera. Exclusively owned by one `CaptureSession`.
pub trait CaptureDevice {
    fn feed(&self) -> LiveFeed;

    /// Bind a recorder to this device. Chunks and the final `Stopped`
    /// event are delivered through `events`.
    fn start_recorder(
        &mut self,
        events: async_channel::Sender<RecorderEvent>,
    ) -> Result<Box<dyn MediaRecorder>, CaptureError>;

    /// Release the device. Must be safe to call more than once, and must
    /// not leave anything holding the camera once a stop grace period has
    /// passed.
    fn release(&mut self);
}

pub trait MediaRecorder {
    fn is_active(&self) -> bool;

    /// Ask the recorder to finish cleanly. It still sends its last chunk
    /// and `Stopped`.
    fn request_stop(&mut self);

    /// Stop at once. Buffered output may be lost; `Stopped` is still sent.
    fn terminate(&mut self);
}

/// How long `PendingRecording::assemble` waits for the recorder's final
/// chunk before giving up and using what arrived.
pub const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(10);

/// One recording in progress: a device, its recorder, and the chunks
/// delivered so far.
pub struct CaptureSession {
    generation: u64,
    device: Box<dyn CaptureDevice>,
    recorder: Box<dyn MediaRecorder>,
    chunks: Arc<Mutex<Vec<Vec<u8>>>>,
    stop_requested: Arc<AtomicBool>,
    finished: async_channel::Receiver<()>,
    feed: LiveFeed,
}

impl CaptureSession {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn feed(&self) -> &LiveFeed {
        &self.feed
    }

    pub fn chunk_count(&self) -> usize {
        self.chunks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// A stopped recording whose last chunks may still be in flight. The
/// device is already released; this only holds the chunk buffer, so it can
/// move to another task.
pub struct PendingRecording {
    generation: u64,
    chunks: Arc<Mutex<Vec<Vec<u8>>>>,
    finished: async_channel::Receiver<()>,
    timeout: Duration,
}

impl PendingRecording {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Wait for the recorder to deliver its final chunk, then concatenate
    /// everything into one payload. If the recorder has not finished within
    /// the stop timeout, the chunks received so far are used.
    pub async fn assemble(self) -> MediaPayload {
        // Resolves on the pump's completion signal, or with an error once
        // the pump has exited; both mean no more chunks.
        if tokio::time::timeout(self.timeout, self.finished.recv())
            .await
            .is_err()
        {
            log::warn!(
                "Recorder for generation {} did not finish within {:?}, using partial data",
                self.generation,
                self.timeout
            );
        }

        let chunks =
            std::mem::take(&mut *self.chunks.lock().unwrap_or_else(PoisonError::into_inner));
        let total: usize = chunks.iter().map(Vec::len).sum();
        log::info!("Recording stopped: {} chunk(s), {total} bytes", chunks.len());

        MediaPayload::new(RECORDING_FILE_NAME, RECORDING_MIME, chunks.concat())
    }
}

pub struct MediaCaptureManager {
    backend: Box<dyn CaptureBackend>,
    stop_timeout: Duration,
}

impl MediaCaptureManager {
    pub fn new(backend: Box<dyn CaptureBackend>) -> Self {
        Self {
            backend,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
        }
    }

    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    /// Ask the platform for a camera. Suspends until access is granted or
    /// refused.
    pub async fn acquire(&self) -> Result<Box<dyn CaptureDevice>, CaptureError> {
        self.backend.acquire().await
    }

    /// Bind a recorder to `device` and start pumping its chunks into a new
    /// session. If the recorder stops without being asked to, a
    /// `SessionEvent::CaptureEnded` tagged with `generation` is sent.
    pub fn begin_recording(
        &self,
        mut device: Box<dyn CaptureDevice>,
        generation: u64,
        notify: async_channel::Sender<SessionEvent>,
    ) -> Result<CaptureSession, CaptureError> {
        let (events_tx, events_rx) = async_channel::unbounded();
        let recorder = match device.start_recorder(events_tx) {
            Ok(r) => r,
            Err(e) => {
                device.release();
                return Err(e);
            }
        };

        let feed = device.feed();
        let chunks = Arc::new(Mutex::new(Vec::new()));
        let stop_requested = Arc::new(AtomicBool::new(false));
        let (done_tx, done_rx) = async_channel::bounded::<()>(1);

        let pump_chunks = chunks.clone();
        let pump_stop = stop_requested.clone();
        let pump_feed = feed.clone();
        tokio::spawn(async move {
            while let Ok(event) = events_rx.recv().await {
                match event {
                    RecorderEvent::Chunk(data) => {
                        if data.is_empty() {
                            continue;
                        }
                        pump_feed.add_bytes(data.len());
                        pump_chunks
                            .lock()
                            .unwrap_or_else(PoisonError::into_inner)
                            .push(data);
                    }
                    RecorderEvent::Stopped => break,
                }
            }
            let _ = done_tx.send(()).await;
            if !pump_stop.load(Ordering::Acquire) {
                log::warn!("Recorder for generation {generation} ended on its own");
                let _ = notify.send(SessionEvent::CaptureEnded { generation }).await;
            }
        });

        Ok(CaptureSession {
            generation,
            device,
            recorder,
            chunks,
            stop_requested,
            finished: done_rx,
            feed,
        })
    }

    /// Stop the recorder and release the device without waiting for the
    /// recorder to wind down. The returned `PendingRecording` yields the
    /// payload; a recording with no chunks yields an empty one.
    pub fn end_recording(&self, session: CaptureSession) -> PendingRecording {
        let CaptureSession {
            generation,
            mut device,
            mut recorder,
            chunks,
            stop_requested,
            finished,
            ..
        } = session;

        stop_requested.store(true, Ordering::Release);
        if recorder.is_active() {
            recorder.request_stop();
        }
        device.release();

        PendingRecording {
            generation,
            chunks,
            finished,
            timeout: self.stop_timeout,
        }
    }

    /// Tear a session down: the recorder is terminated outright and the
    /// device released. Whatever was recorded is dropped.
    pub fn abort(&self, session: CaptureSession) {
        let CaptureSession {
            generation,
            mut device,
            mut recorder,
            stop_requested,
            ..
        } = session;

        stop_requested.store(true, Ordering::Release);
        if recorder.is_active() {
            recorder.terminate();
        }
        device.release();
        log::info!("Capture session {generation} aborted");
    }
}
