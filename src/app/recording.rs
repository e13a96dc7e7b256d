use super::state::{Mode, Phase};
use super::SessionController;
use crate::capture::RECORDING_FILE_NAME;
use crate::error::SessionError;

impl SessionController {
    /// Acquire the camera and start recording. Any previous result is
    /// cleared first. A denied or failed acquisition leaves the session
    /// idle with no capture and no preview.
    pub async fn start_recording(&mut self) {
        if self.state.mode != Mode::Record {
            log::info!("Start ignored: not in record mode");
            return;
        }
        if !matches!(self.state.phase, Phase::Idle | Phase::Result) {
            log::info!("Start ignored while {:?}", self.state.phase);
            return;
        }

        log::info!("Starting recording");
        let generation = self.state.advance_generation();
        self.state.clear_outputs();
        self.preview.clear_result();
        self.set_phase(Phase::Idle);

        let device = match self.capture.acquire().await {
            Ok(device) => device,
            Err(e) => {
                log::error!("Failed to start recording: {}", SessionError::from(e));
                return;
            }
        };

        let session = match self
            .capture
            .begin_recording(device, generation, self.events.clone())
        {
            Ok(session) => session,
            Err(e) => {
                log::error!("Failed to start recorder: {}", SessionError::from(e));
                return;
            }
        };

        let feed = session.feed().clone();
        self.state.capture = Some(session);
        self.set_phase(Phase::Recording);
        self.preview.sync(self.state.phase, Some(&feed)).await;
    }

    /// Stop recording and submit what was captured. With no active
    /// recording this only makes sure the preview is detached.
    ///
    /// Returns without waiting for the recorder: the device is released
    /// here, and the payload is assembled on the upload task.
    pub async fn stop_recording(&mut self) {
        let Some(session) = self.state.capture.take() else {
            self.preview.detach();
            log::debug!("Stop ignored: no active recording");
            return;
        };

        log::info!("Stopping recording");
        self.preview.detach();

        let pending = self.capture.end_recording(session);
        self.dispatch_upload(RECORDING_FILE_NAME, pending.assemble());
    }
}
