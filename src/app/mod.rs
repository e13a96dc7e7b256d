mod event_handler;
mod pipeline;
mod preview;
mod recording;
mod state;

use std::path::PathBuf;
use std::sync::Arc;

pub use preview::PreviewSync;
pub use state::{Mode, Phase, SessionEvent, SessionState, UserCommand};

use crate::capture::MediaCaptureManager;
use crate::ui::file_input::FileInput;
use crate::uploader::AnalysisBackend;

/// Where processed videos are downloaded to, when enabled.
pub struct ResultArchive {
    pub client: reqwest::Client,
    pub dir: PathBuf,
}

/// Single authority over `SessionState`. Lives on the main thread and
/// handles one `SessionEvent` at a time; background work reports back
/// through `events`.
pub struct SessionController {
    state: SessionState,
    capture: MediaCaptureManager,
    preview: PreviewSync,
    uploads: Arc<dyn AnalysisBackend>,
    file_input: FileInput,
    archive: Option<ResultArchive>,
    events: async_channel::Sender<SessionEvent>,
}

impl SessionController {
    pub fn new(
        capture: MediaCaptureManager,
        preview: PreviewSync,
        uploads: Arc<dyn AnalysisBackend>,
        events: async_channel::Sender<SessionEvent>,
    ) -> Self {
        Self {
            state: SessionState::default(),
            capture,
            preview,
            uploads,
            file_input: FileInput::new(),
            archive: None,
            events,
        }
    }

    pub fn with_archive(mut self, archive: ResultArchive) -> Self {
        self.archive = Some(archive);
        self
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    #[cfg(test)]
    pub fn file_input(&self) -> &FileInput {
        &self.file_input
    }

    #[cfg(test)]
    pub fn preview_attached(&self) -> bool {
        self.preview.is_attached()
    }

    fn set_phase(&mut self, phase: Phase) {
        if self.state.phase != phase {
            log::info!("Phase {:?} -> {:?}", self.state.phase, phase);
            self.state.phase = phase;
        }
    }

    /// Release the camera and detach the preview before exiting.
    pub fn shutdown(&mut self) {
        self.preview.detach();
        if let Some(session) = self.state.capture.take() {
            self.capture.abort(session);
            self.set_phase(Phase::Idle);
        }
    }
}
