use std::path::{Path, PathBuf};

use gtk4::gio;
use gtk4::prelude::*;
use thiserror::Error;

use crate::app::{SessionEvent, UserCommand};
use crate::capture::MediaPayload;

#[derive(Debug, Error)]
pub enum FileInputError {
    #[error("not a video file: {0}")]
    NotVideo(PathBuf),
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Video MIME type for a path, judged by extension. `None` for anything
/// that is not a browser-playable video.
pub fn detect_video_mime(path: &Path) -> Option<&'static str> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())?;

    match ext.as_str() {
        "mp4" | "m4v" => Some("video/mp4"),
        "webm" => Some("video/webm"),
        "mov" => Some("video/quicktime"),
        "mkv" => Some("video/x-matroska"),
        "avi" => Some("video/x-msvideo"),
        "ogv" => Some("video/ogg"),
        "mpeg" | "mpg" => Some("video/mpeg"),
        "3gp" => Some("video/3gpp"),
        _ => None,
    }
}

/// File-selection input. Behaves like a browser file input: choosing the
/// path it already holds does not count as a change, so it has to be
/// cleared before the same file can be picked again.
#[derive(Debug, Default)]
pub struct FileInput {
    value: Option<PathBuf>,
}

impl FileInput {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn value(&self) -> Option<&Path> {
        self.value.as_deref()
    }

    pub fn clear(&mut self) {
        self.value = None;
    }

    /// Choose `path`. Returns `Ok(None)` when the choice is not a change.
    pub fn choose(&mut self, path: &Path) -> Result<Option<MediaPayload>, FileInputError> {
        if self.value.as_deref() == Some(path) {
            return Ok(None);
        }
        let mime = detect_video_mime(path).ok_or_else(|| FileInputError::NotVideo(path.to_path_buf()))?;
        let data = std::fs::read(path).map_err(|source| FileInputError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "video".to_string());

        self.value = Some(path.to_path_buf());
        Ok(Some(MediaPayload::new(name, mime, data)))
    }

    /// Open the picker: reset first, then choose. Re-selecting the same
    /// file always yields a payload this way.
    pub fn open_and_choose(&mut self, path: &Path) -> Result<Option<MediaPayload>, FileInputError> {
        self.clear();
        self.choose(path)
    }
}

/// Show a file dialog offering only videos. The chosen path is sent back
/// as `UserCommand::SelectFile`.
pub fn open_video_dialog(
    parent: &impl IsA<gtk4::Window>,
    sender: async_channel::Sender<SessionEvent>,
) {
    let filter = gtk4::FileFilter::new();
    filter.set_name(Some("Videos"));
    filter.add_mime_type("video/*");
    let filters = gio::ListStore::new::<gtk4::FileFilter>();
    filters.append(&filter);

    let dialog = gtk4::FileDialog::builder()
        .title("Choose a video")
        .modal(true)
        .filters(&filters)
        .default_filter(&filter)
        .build();

    dialog.open(Some(parent), gio::Cancellable::NONE, move |result| {
        match result {
            Ok(file) => match file.path() {
                Some(path) => {
                    let event = SessionEvent::Command(UserCommand::SelectFile(path));
                    if sender.try_send(event).is_err() {
                        log::warn!("Session loop closed, dropping file selection");
                    }
                }
                None => log::warn!("Chosen file has no local path: {}", file.uri()),
            },
            Err(e) => log::debug!("File dialog dismissed: {e}"),
        }
    });
}
