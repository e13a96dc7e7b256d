pub mod dashboard;
pub mod file_input;
pub mod preview;
pub mod summary;

use async_trait::async_trait;
use thiserror::Error;

use crate::capture::LiveFeed;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreviewError {
    #[error("playback rejected: {0}")]
    Rejected(String),
}

/// Somewhere to show the live camera while recording, or the processed
/// video afterwards. Never both at once.
#[async_trait(?Send)]
pub trait PreviewSurface {
    /// Start showing `feed`. Starting playback may suspend.
    async fn attach(&mut self, feed: LiveFeed) -> Result<(), PreviewError>;

    /// Stop showing the live feed and drop every reference to it.
    fn detach(&mut self);

    fn show_result(&mut self, video_url: &str);

    fn clear_result(&mut self);
}
