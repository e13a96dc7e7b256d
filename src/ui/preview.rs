use std::time::{Duration, Instant};

use async_trait::async_trait;
use gtk4::prelude::*;
use gtk4::{gio, glib};

use super::summary::human_bytes;
use super::{PreviewError, PreviewSurface};
use crate::capture::LiveFeed;

const TICK: Duration = Duration::from_millis(500);

/// Dashboard preview: a ticking `● REC mm:ss  size` indicator while the
/// camera records, and a `gtk4::Video` playing the processed result.
pub struct GtkPreview {
    rec_label: gtk4::Label,
    video: gtk4::Video,
    ticker: Option<(LiveFeed, glib::SourceId)>,
}

impl GtkPreview {
    pub fn new(rec_label: gtk4::Label, video: gtk4::Video) -> Self {
        Self {
            rec_label,
            video,
            ticker: None,
        }
    }
}

#[async_trait(?Send)]
impl PreviewSurface for GtkPreview {
    async fn attach(&mut self, feed: LiveFeed) -> Result<(), PreviewError> {
        if !feed.is_live() {
            return Err(PreviewError::Rejected(format!(
                "{} is no longer capturing",
                feed.label()
            )));
        }
        self.detach();
        self.clear_result();

        self.rec_label.set_text(&rec_line(0, feed.bytes_captured()));
        self.rec_label.set_visible(true);

        let label = self.rec_label.clone();
        let ticker_feed = feed.clone();
        let start = Instant::now();
        let source = glib::timeout_add_local(TICK, move || {
            label.set_text(&rec_line(
                start.elapsed().as_secs(),
                ticker_feed.bytes_captured(),
            ));
            glib::ControlFlow::Continue
        });
        self.ticker = Some((feed, source));
        Ok(())
    }

    fn detach(&mut self) {
        if let Some((_feed, source)) = self.ticker.take() {
            source.remove();
        }
        self.rec_label.set_visible(false);
    }

    fn show_result(&mut self, video_url: &str) {
        self.detach();
        let file = gio::File::for_uri(video_url);
        self.video.set_file(Some(&file));
        self.video.set_visible(true);
    }

    fn clear_result(&mut self) {
        self.video.set_file(None::<&gio::File>);
        self.video.set_visible(false);
    }
}

fn rec_line(elapsed_secs: u64, bytes: u64) -> String {
    let mins = elapsed_secs / 60;
    let secs = elapsed_secs % 60;
    format!("\u{25CF} REC {mins:02}:{secs:02}  {}", human_bytes(bytes))
}
