use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::capture::MediaPayload;

/// Multipart field the analysis service reads the video from.
pub const VIDEO_FIELD: &str = "video";

/// Per-video posture statistics returned by the service.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub total_frames: u64,
    pub bad_posture_frames: u64,
    pub issue_counts: HashMap<String, u64>,
    /// Seconds into the video at which bad posture was detected
    #[serde(default)]
    pub bad_posture_timestamps: Vec<f64>,
    #[serde(default)]
    pub video_filename: Option<String>,
}

/// A successful analysis: where to fetch the annotated video, and the numbers.
#[derive(Debug, Clone, PartialEq)]
pub struct Analysis {
    pub video_url: String,
    pub summary: AnalysisSummary,
}

/// Response body of `POST /analyze`.
#[derive(Deserialize)]
struct AnalyzeResponse {
    video_url: String,
    #[serde(flatten)]
    summary: AnalysisSummary,
}

impl TryFrom<AnalyzeResponse> for Analysis {
    type Error = UploadError;

    fn try_from(resp: AnalyzeResponse) -> Result<Self, Self::Error> {
        if resp.summary.bad_posture_frames > resp.summary.total_frames {
            return Err(UploadError::Malformed(format!(
                "bad_posture_frames ({}) exceeds total_frames ({})",
                resp.summary.bad_posture_frames, resp.summary.total_frames
            )));
        }
        Ok(Self {
            video_url: resp.video_url,
            summary: resp.summary,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    #[error("request failed: {0}")]
    Network(String),
    #[error("server returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("unreadable response: {0}")]
    Malformed(String),
}

/// Something that turns a video into an `Analysis`. One call per upload,
/// no retries.
#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    async fn upload(&self, payload: MediaPayload) -> Result<Analysis, UploadError>;
}

/// Submits videos to the remote analysis endpoint as multipart form data.
pub struct UploadCoordinator {
    client: reqwest::Client,
    endpoint: String,
}

impl UploadCoordinator {
    /// The client is built without a timeout: a hung request keeps the
    /// session in `Uploading`.
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl AnalysisBackend for UploadCoordinator {
    async fn upload(&self, payload: MediaPayload) -> Result<Analysis, UploadError> {
        log::info!(
            "Uploading {} ({} bytes, {}) to {}",
            payload.name(),
            payload.len(),
            payload.mime(),
            self.endpoint
        );

        let part = Part::bytes(payload.bytes().to_vec())
            .file_name(payload.name().to_string())
            .mime_str(payload.mime())
            .map_err(|e| UploadError::Network(format!("invalid MIME type: {e}")))?;
        let form = Form::new().part(VIDEO_FIELD, part);

        let resp = self
            .client
            .post(&self.endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| UploadError::Network(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(UploadError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| UploadError::Network(e.to_string()))?;
        let parsed: AnalyzeResponse =
            serde_json::from_slice(&body).map_err(|e| UploadError::Malformed(e.to_string()))?;

        parsed.try_into()
    }
}
