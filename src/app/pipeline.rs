use std::future::Future;

use super::state::{InFlightUpload, Mode, Phase, SessionEvent};
use super::SessionController;
use crate::capture::MediaPayload;
use crate::error::SessionError;
use crate::uploader::{Analysis, UploadError};

impl SessionController {
    /// Upload the selected file. Only valid in upload mode, with a file
    /// selected, and with nothing recording or uploading.
    pub fn submit(&mut self) {
        if self.state.mode != Mode::Upload {
            log::info!("Submit ignored in record mode; stopping a recording submits it");
            return;
        }
        if matches!(self.state.phase, Phase::Recording | Phase::Uploading) {
            log::info!("Submit ignored while {:?}", self.state.phase);
            return;
        }
        let Some(payload) = self.state.selected_file.clone() else {
            log::info!("Submit ignored: no file selected");
            return;
        };
        let name = payload.name().to_string();
        self.dispatch_upload(&name, std::future::ready(payload));
    }

    /// Hand the payload `payload` resolves to over to the upload backend on
    /// the runtime. The outcome comes back as `SessionEvent::UploadFinished`.
    pub(super) fn dispatch_upload<F>(&mut self, payload_name: &str, payload: F)
    where
        F: Future<Output = MediaPayload> + Send + 'static,
    {
        self.state.summary = None;
        self.state.result_video = None;
        self.preview.clear_result();

        let generation = self.state.generation;
        self.state.in_flight = Some(InFlightUpload {
            generation,
            payload_name: payload_name.to_string(),
        });
        self.set_phase(Phase::Uploading);

        let uploads = self.uploads.clone();
        let sender = self.events.clone();
        tokio::spawn(async move {
            let payload = payload.await;
            if payload.is_empty() {
                log::warn!("Uploading an empty payload: {}", payload.name());
            }
            let outcome = uploads.upload(payload).await;
            let _ = sender
                .send(SessionEvent::UploadFinished {
                    generation,
                    outcome,
                })
                .await;
        });
    }

    pub(super) fn finish_upload(&mut self, generation: u64, outcome: Result<Analysis, UploadError>) {
        let pending = self.state.in_flight.as_ref().map(|u| u.generation);
        if self.state.phase != Phase::Uploading || pending != Some(generation) {
            let stale = SessionError::StaleResult {
                result: generation,
                current: self.state.generation,
            };
            log::debug!("Discarding {stale}");
            return;
        }

        let upload = self.state.in_flight.take();
        self.state.selected_file = None;
        if self.state.mode == Mode::Upload {
            self.file_input.clear();
        }

        match outcome {
            Ok(analysis) => {
                log::info!(
                    "Analysis ready: {} of {} frames with bad posture",
                    analysis.summary.bad_posture_frames,
                    analysis.summary.total_frames
                );
                self.preview.show_result(&analysis.video_url);
                self.archive_video(generation, &analysis.video_url);
                self.state.summary = Some(analysis.summary);
                self.state.result_video = Some(analysis.video_url);
                self.set_phase(Phase::Result);
            }
            Err(e) => {
                let err = SessionError::from(e);
                let name = upload.map(|u| u.payload_name).unwrap_or_default();
                log::error!("Analysis of {name} failed: {err}");
                self.set_phase(Phase::Idle);
            }
        }
    }

    /// Download the processed video in the background, if enabled.
    fn archive_video(&self, generation: u64, url: &str) {
        let Some(archive) = &self.archive else {
            return;
        };
        let client = archive.client.clone();
        let dir = archive.dir.clone();
        let url = url.to_string();
        let sender = self.events.clone();

        tokio::spawn(async move {
            let result = crate::results::save_video(&client, &url, &dir, |done, total| {
                log::debug!("Downloading result video: {done}/{total} bytes");
            })
            .await;

            let event = match result {
                Ok(path) => SessionEvent::VideoSaved { generation, path },
                Err(e) => SessionEvent::VideoSaveFailed {
                    generation,
                    error: e.to_string(),
                },
            };
            let _ = sender.send(event).await;
        });
    }
}
