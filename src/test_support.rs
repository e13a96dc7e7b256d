//! Fakes for the platform seams: a scriptable camera, a recording preview
//! surface and a scripted analysis backend.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::app::{PreviewSync, SessionController, SessionEvent};
use crate::capture::{
    CaptureBackend, CaptureDevice, CaptureError, LiveFeed, MediaCaptureManager, MediaPayload,
    MediaRecorder, RecorderEvent,
};
use crate::ui::{PreviewError, PreviewSurface};
use crate::uploader::{Analysis, AnalysisBackend, AnalysisSummary, UploadError};

#[derive(Default)]
struct CameraInner {
    deny: bool,
    fail_recorder: bool,
    ignore_stop: bool,
    acquisitions: usize,
    releases: usize,
    stop_requests: usize,
    terminations: usize,
    active: bool,
    sender: Option<async_channel::Sender<RecorderEvent>>,
    feed: Option<LiveFeed>,
}

#[derive(Clone, Default)]
pub struct FakeCamera {
    inner: Rc<RefCell<CameraInner>>,
}

impl FakeCamera {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn deny(&self) {
        self.inner.borrow_mut().deny = true;
    }

    pub fn fail_recorder_start(&self) {
        self.inner.borrow_mut().fail_recorder = true;
    }

    /// The recorder keeps running after a stop request, like an encoder
    /// that never flushes.
    pub fn ignore_stop(&self) {
        self.inner.borrow_mut().ignore_stop = true;
    }

    pub fn push_chunk(&self, data: Vec<u8>) {
        if let Some(tx) = &self.inner.borrow().sender {
            let _ = tx.try_send(RecorderEvent::Chunk(data));
        }
    }

    /// The recorder stops without being asked, as when the camera is unplugged.
    pub fn end_unexpectedly(&self) {
        let mut inner = self.inner.borrow_mut();
        inner.active = false;
        if let Some(tx) = inner.sender.take() {
            let _ = tx.try_send(RecorderEvent::Stopped);
        }
    }

    pub fn acquisitions(&self) -> usize {
        self.inner.borrow().acquisitions
    }

    pub fn releases(&self) -> usize {
        self.inner.borrow().releases
    }

    pub fn stop_requests(&self) -> usize {
        self.inner.borrow().stop_requests
    }

    pub fn terminations(&self) -> usize {
        self.inner.borrow().terminations
    }

    pub fn last_feed(&self) -> Option<LiveFeed> {
        self.inner.borrow().feed.clone()
    }
}

#[async_trait(?Send)]
impl CaptureBackend for FakeCamera {
    async fn acquire(&self) -> Result<Box<dyn CaptureDevice>, CaptureError> {
        let mut inner = self.inner.borrow_mut();
        if inner.deny {
            return Err(CaptureError::Denied("camera permission refused".into()));
        }
        inner.acquisitions += 1;
        let feed = LiveFeed::new("fake-cam");
        inner.feed = Some(feed.clone());
        Ok(Box::new(FakeDevice {
            camera: self.clone(),
            feed,
            released: false,
        }))
    }
}

struct FakeDevice {
    camera: FakeCamera,
    feed: LiveFeed,
    released: bool,
}

impl CaptureDevice for FakeDevice {
    fn feed(&self) -> LiveFeed {
        self.feed.clone()
    }

    fn start_recorder(
        &mut self,
        events: async_channel::Sender<RecorderEvent>,
    ) -> Result<Box<dyn MediaRecorder>, CaptureError> {
        let mut inner = self.camera.inner.borrow_mut();
        if inner.fail_recorder {
            return Err(CaptureError::Recorder("encoder unavailable".into()));
        }
        inner.sender = Some(events);
        inner.active = true;
        Ok(Box::new(FakeRecorder {
            camera: self.camera.clone(),
        }))
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.feed.revoke();
            self.camera.inner.borrow_mut().releases += 1;
        }
    }
}

struct FakeRecorder {
    camera: FakeCamera,
}

impl MediaRecorder for FakeRecorder {
    fn is_active(&self) -> bool {
        self.camera.inner.borrow().active
    }

    fn request_stop(&mut self) {
        let mut inner = self.camera.inner.borrow_mut();
        inner.stop_requests += 1;
        if inner.ignore_stop {
            return;
        }
        inner.active = false;
        if let Some(tx) = inner.sender.take() {
            let _ = tx.try_send(RecorderEvent::Stopped);
        }
    }

    fn terminate(&mut self) {
        let mut inner = self.camera.inner.borrow_mut();
        inner.terminations += 1;
        inner.active = false;
        if let Some(tx) = inner.sender.take() {
            let _ = tx.try_send(RecorderEvent::Stopped);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewCall {
    Attach(String),
    Detach,
    ShowResult(String),
    ClearResult,
}

#[derive(Default)]
struct PreviewInner {
    reject: bool,
    calls: Vec<PreviewCall>,
}

#[derive(Clone, Default)]
pub struct FakePreview {
    inner: Rc<RefCell<PreviewInner>>,
}

impl FakePreview {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reject_attach(&self) {
        self.inner.borrow_mut().reject = true;
    }

    pub fn calls(&self) -> Vec<PreviewCall> {
        self.inner.borrow().calls.clone()
    }

    pub fn attach_count(&self) -> usize {
        self.inner
            .borrow()
            .calls
            .iter()
            .filter(|c| matches!(c, PreviewCall::Attach(_)))
            .count()
    }
}

#[async_trait(?Send)]
impl PreviewSurface for FakePreview {
    async fn attach(&mut self, feed: LiveFeed) -> Result<(), PreviewError> {
        tokio::task::yield_now().await;
        let mut inner = self.inner.borrow_mut();
        if inner.reject {
            return Err(PreviewError::Rejected("autoplay blocked".into()));
        }
        inner.calls.push(PreviewCall::Attach(feed.label().to_string()));
        Ok(())
    }

    fn detach(&mut self) {
        self.inner.borrow_mut().calls.push(PreviewCall::Detach);
    }

    fn show_result(&mut self, video_url: &str) {
        self.inner
            .borrow_mut()
            .calls
            .push(PreviewCall::ShowResult(video_url.to_string()));
    }

    fn clear_result(&mut self) {
        self.inner.borrow_mut().calls.push(PreviewCall::ClearResult);
    }
}

/// Answers uploads from a queue of canned outcomes and remembers what it
/// was sent.
#[derive(Default)]
pub struct ScriptedAnalyzer {
    outcomes: Mutex<VecDeque<Result<Analysis, UploadError>>>,
    received: Mutex<Vec<MediaPayload>>,
}

impl ScriptedAnalyzer {
    pub fn push(&self, outcome: Result<Analysis, UploadError>) {
        self.outcomes.lock().unwrap().push_back(outcome);
    }

    pub fn received(&self) -> Vec<MediaPayload> {
        self.received.lock().unwrap().clone()
    }
}

#[async_trait]
impl AnalysisBackend for ScriptedAnalyzer {
    async fn upload(&self, payload: MediaPayload) -> Result<Analysis, UploadError> {
        self.received.lock().unwrap().push(payload);
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(UploadError::Network("no scripted response".into())))
    }
}

pub fn sample_analysis() -> Analysis {
    Analysis {
        video_url: "http://localhost:8000/video/annotated_1.webm".into(),
        summary: AnalysisSummary {
            total_frames: 240,
            bad_posture_frames: 60,
            issue_counts: HashMap::from([
                ("Neck".to_string(), 25),
                ("Back".to_string(), 40),
                ("Knee".to_string(), 3),
            ]),
            bad_posture_timestamps: vec![0.5, 0.53],
            video_filename: Some("annotated_1.webm".into()),
        },
    }
}

/// A controller wired to fakes, plus handles to drive and inspect them.
pub struct Harness {
    pub controller: SessionController,
    pub events: async_channel::Receiver<SessionEvent>,
    pub camera: FakeCamera,
    pub preview: FakePreview,
    pub analyzer: Arc<ScriptedAnalyzer>,
}

impl Harness {
    pub fn new() -> Self {
        let (tx, rx) = async_channel::unbounded();
        let camera = FakeCamera::new();
        let preview = FakePreview::new();
        let analyzer = Arc::new(ScriptedAnalyzer::default());
        let controller = SessionController::new(
            MediaCaptureManager::new(Box::new(camera.clone()))
                .with_stop_timeout(Duration::from_millis(200)),
            PreviewSync::new(Box::new(preview.clone())),
            analyzer.clone(),
            tx,
        );
        Self {
            controller,
            events: rx,
            camera,
            preview,
            analyzer,
        }
    }

    pub async fn next_event(&self) -> SessionEvent {
        self.events.recv().await.unwrap()
    }

    /// Receive the next background event and hand it to the controller.
    pub async fn deliver_next(&mut self) {
        let event = self.next_event().await;
        let _ = self.controller.handle_event(event).await;
    }
}
