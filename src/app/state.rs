use std::path::PathBuf;

use crate::capture::{CaptureSession, MediaPayload};
use crate::uploader::{Analysis, AnalysisSummary, UploadError};

/// Where the video comes from. Switching it resets the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Mode {
    #[default]
    Upload,
    Record,
}

/// Session phase. Exactly one is active at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Idle,
    Recording,
    Uploading,
    Result,
}

/// Requests coming from the front end.
#[derive(Debug, Clone, PartialEq)]
pub enum UserCommand {
    SetMode(Mode),
    SelectFile(PathBuf),
    Submit,
    StartRecording,
    StopRecording,
    Quit,
}

/// Everything the controller reacts to. Results of background work carry
/// the generation they were started under.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Command(UserCommand),
    UploadFinished {
        generation: u64,
        outcome: Result<Analysis, UploadError>,
    },
    CaptureEnded {
        generation: u64,
    },
    VideoSaved {
        generation: u64,
        path: PathBuf,
    },
    VideoSaveFailed {
        generation: u64,
        error: String,
    },
}

/// The upload currently on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InFlightUpload {
    pub generation: u64,
    pub payload_name: String,
}

/// All session state, mutated only by `SessionController`.
#[derive(Default)]
pub struct SessionState {
    pub(super) mode: Mode,
    pub(super) phase: Phase,
    pub(super) generation: u64,
    pub(super) selected_file: Option<MediaPayload>,
    pub(super) capture: Option<CaptureSession>,
    pub(super) in_flight: Option<InFlightUpload>,
    pub(super) summary: Option<AnalysisSummary>,
    pub(super) result_video: Option<String>,
}

impl SessionState {
    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[cfg(test)]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn selected_file(&self) -> Option<&MediaPayload> {
        self.selected_file.as_ref()
    }

    pub fn capture(&self) -> Option<&CaptureSession> {
        self.capture.as_ref()
    }

    pub fn in_flight(&self) -> Option<&InFlightUpload> {
        self.in_flight.as_ref()
    }

    pub fn summary(&self) -> Option<&AnalysisSummary> {
        self.summary.as_ref()
    }

    pub fn result_video(&self) -> Option<&str> {
        self.result_video.as_deref()
    }

    /// Drop the selection and any shown result.
    pub(super) fn clear_outputs(&mut self) {
        self.selected_file = None;
        self.summary = None;
        self.result_video = None;
    }

    pub(super) fn advance_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// Structural invariants that hold between events.
    pub fn invariants_hold(&self) -> bool {
        let recording_ok = match self.phase {
            Phase::Recording => self.capture.is_some() && self.mode == Mode::Record,
            _ => self.capture.is_none(),
        };
        let uploading_ok = (self.phase == Phase::Uploading) == self.in_flight.is_some();
        let result_ok = match self.phase {
            Phase::Result => self.summary.is_some() && self.result_video.is_some(),
            _ => self.summary.is_none() && self.result_video.is_none(),
        };
        let file_ok = self.mode == Mode::Upload || self.selected_file.is_none();
        recording_ok && uploading_ok && result_ok && file_ok
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_state_is_idle_upload() {
        let state = SessionState::default();
        assert_eq!(state.mode(), Mode::Upload);
        assert_eq!(state.phase(), Phase::Idle);
        assert_eq!(state.generation(), 0);
        assert!(state.invariants_hold());
    }

    #[test]
    fn result_without_summary_breaks_invariants() {
        let state = SessionState {
            phase: Phase::Result,
            result_video: Some("u".into()),
            ..SessionState::default()
        };
        assert!(!state.invariants_hold());
    }

    #[test]
    fn selected_file_only_in_upload_mode() {
        let state = SessionState {
            mode: Mode::Record,
            selected_file: Some(MediaPayload::new("a.mp4", "video/mp4", vec![1])),
            ..SessionState::default()
        };
        assert!(!state.invariants_hold());
    }

    #[test]
    fn clear_outputs_keeps_mode_and_phase() {
        let mut state = SessionState {
            phase: Phase::Result,
            summary: Some(AnalysisSummary::default()),
            result_video: Some("u".into()),
            ..SessionState::default()
        };
        state.clear_outputs();
        state.phase = Phase::Idle;
        assert!(state.summary().is_none());
        assert!(state.result_video().is_none());
        assert!(state.invariants_hold());
    }
}
