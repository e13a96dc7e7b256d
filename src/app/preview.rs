use super::state::Phase;
use crate::capture::LiveFeed;
use crate::ui::PreviewSurface;

/// Keeps the preview surface bound to the capture device exactly while
/// the session is recording.
pub struct PreviewSync {
    surface: Box<dyn PreviewSurface>,
    attached: Option<LiveFeed>,
}

impl PreviewSync {
    pub fn new(surface: Box<dyn PreviewSurface>) -> Self {
        Self {
            surface,
            attached: None,
        }
    }

    #[cfg(test)]
    pub fn is_attached(&self) -> bool {
        self.attached.is_some()
    }

    /// Reconcile the surface with `phase` and the active device's feed.
    /// An attach failure is logged and leaves the preview detached.
    pub async fn sync(&mut self, phase: Phase, feed: Option<&LiveFeed>) {
        let feed = match (phase, feed) {
            (Phase::Recording, Some(feed)) if feed.is_live() => feed,
            _ => {
                self.detach();
                return;
            }
        };

        if let Some(current) = &self.attached {
            if current.same_source(feed) {
                return;
            }
            self.detach();
        }

        match self.surface.attach(feed.clone()).await {
            Ok(()) => {
                log::debug!("Preview attached to {}", feed.label());
                self.attached = Some(feed.clone());
            }
            Err(e) => log::warn!("Preview error: {e}"),
        }
    }

    /// Drop the live feed immediately. Safe to call when nothing is attached.
    pub fn detach(&mut self) {
        if let Some(feed) = self.attached.take() {
            log::debug!("Preview detached from {}", feed.label());
            self.surface.detach();
        }
    }

    pub fn show_result(&mut self, video_url: &str) {
        self.detach();
        self.surface.show_result(video_url);
    }

    pub fn clear_result(&mut self) {
        self.surface.clear_result();
    }
}
