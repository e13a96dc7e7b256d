use std::ops::ControlFlow;
use std::path::Path;

use super::state::{Mode, Phase, SessionEvent, UserCommand};
use super::SessionController;
use crate::capture::MediaPayload;

impl SessionController {
    /// Handle one event. This is the core state machine.
    pub async fn handle_event(&mut self, event: SessionEvent) -> ControlFlow<()> {
        match event {
            SessionEvent::Command(command) => {
                if let ControlFlow::Break(()) = self.handle_command(command).await {
                    return ControlFlow::Break(());
                }
            }
            SessionEvent::UploadFinished {
                generation,
                outcome,
            } => self.finish_upload(generation, outcome),
            SessionEvent::CaptureEnded { generation } => {
                let active = self.state.capture.as_ref().map(|c| c.generation());
                if active == Some(generation) {
                    log::warn!("Recorder ended on its own, finishing recording");
                    self.stop_recording().await;
                } else {
                    log::debug!("Ignoring capture end from generation {generation}");
                }
            }
            SessionEvent::VideoSaved { generation, path } => {
                if generation == self.state.generation {
                    log::info!("Saved analyzed video to {}", path.display());
                } else {
                    log::debug!("Video from generation {generation} saved after reset");
                }
            }
            SessionEvent::VideoSaveFailed { generation, error } => {
                log::warn!("Saving video from generation {generation} failed: {error}");
            }
        }

        debug_assert!(self.state.invariants_hold());
        ControlFlow::Continue(())
    }

    async fn handle_command(&mut self, command: UserCommand) -> ControlFlow<()> {
        match command {
            UserCommand::SetMode(mode) => self.set_mode(mode),
            UserCommand::SelectFile(path) => self.choose_file(&path),
            UserCommand::Submit => self.submit(),
            UserCommand::StartRecording => self.start_recording().await,
            UserCommand::StopRecording => self.stop_recording().await,
            UserCommand::Quit => {
                self.shutdown();
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    /// Switch input mode. A real change is a full reset: any capture is
    /// torn down, a pending upload is abandoned, and the generation moves
    /// on so its late result is discarded.
    pub fn set_mode(&mut self, mode: Mode) {
        if mode == self.state.mode {
            // Re-selecting the current mode only clears outputs; capture and upload keep going.
            self.state.clear_outputs();
            self.file_input.clear();
            self.preview.clear_result();
            if self.state.phase == Phase::Result {
                self.set_phase(Phase::Idle);
            }
            return;
        }

        log::info!("Mode {:?} -> {:?}", self.state.mode, mode);
        self.preview.detach();
        if let Some(session) = self.state.capture.take() {
            self.capture.abort(session);
        }
        if let Some(upload) = self.state.in_flight.take() {
            log::info!(
                "Abandoning upload of {} (generation {})",
                upload.payload_name,
                upload.generation
            );
        }

        self.state.advance_generation();
        self.state.mode = mode;
        self.state.clear_outputs();
        self.file_input.clear();
        self.preview.clear_result();
        self.set_phase(Phase::Idle);
    }

    /// Open the file picker on `path` and select what it yields.
    pub fn choose_file(&mut self, path: &Path) {
        if self.state.mode != Mode::Upload {
            log::info!("Ignoring file selection outside upload mode");
            return;
        }
        match self.file_input.open_and_choose(path) {
            Ok(Some(payload)) => self.select_file(payload),
            Ok(None) => {}
            Err(e) => log::warn!("File selection failed: {e}"),
        }
    }

    /// Store `payload` as the pending selection. Does not change phase.
    pub fn select_file(&mut self, payload: MediaPayload) {
        if self.state.mode != Mode::Upload {
            log::info!("Ignoring file selection outside upload mode");
            return;
        }
        log::info!("Selected {} ({} bytes)", payload.name(), payload.len());
        self.state.selected_file = Some(payload);
    }
}
