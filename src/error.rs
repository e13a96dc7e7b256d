//! Session-level error kinds.
//!
//! None of these leave the event loop. The controller logs them and falls
//! back to `Phase::Idle`.

use thiserror::Error;

use crate::capture::CaptureError;
use crate::uploader::UploadError;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("camera access denied: {0}")]
    CapabilityDenied(String),

    #[error("capture failed: {0}")]
    CaptureFailed(String),

    #[error("network failure: {0}")]
    NetworkFailure(String),

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("stale result from generation {result} (session is at {current})")]
    StaleResult { result: u64, current: u64 },
}

impl From<CaptureError> for SessionError {
    fn from(err: CaptureError) -> Self {
        match err {
            CaptureError::Denied(msg) => Self::CapabilityDenied(msg),
            other => Self::CaptureFailed(other.to_string()),
        }
    }
}

impl From<UploadError> for SessionError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::Malformed(msg) => Self::MalformedResponse(msg),
            other => Self::NetworkFailure(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn denied_capture_maps_to_capability_denied() {
        let err: SessionError = CaptureError::Denied("/dev/video0".into()).into();
        assert!(matches!(err, SessionError::CapabilityDenied(_)));
    }

    #[test]
    fn recorder_failure_maps_to_capture_failed() {
        let err: SessionError = CaptureError::Recorder("ffmpeg missing".into()).into();
        assert!(matches!(err, SessionError::CaptureFailed(_)));
        assert!(err.to_string().contains("ffmpeg missing"));
    }

    #[test]
    fn http_status_maps_to_network_failure() {
        let err: SessionError = UploadError::Status {
            status: 502,
            body: "bad gateway".into(),
        }
        .into();
        assert!(matches!(err, SessionError::NetworkFailure(_)));
    }

    #[test]
    fn malformed_body_keeps_its_kind() {
        let err: SessionError = UploadError::Malformed("expected value".into()).into();
        assert!(matches!(err, SessionError::MalformedResponse(_)));
    }

    #[test]
    fn stale_result_display() {
        let err = SessionError::StaleResult { result: 2, current: 3 };
        assert_eq!(
            err.to_string(),
            "stale result from generation 2 (session is at 3)"
        );
    }
}
