use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Hosted analysis service used when nothing else is configured.
pub const DEFAULT_SERVER_URL: &str = "https://full-stack-rule-based-bad-posture-bs2f.onrender.com";

/// How the camera is opened through ffmpeg.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// ffmpeg executable (name on PATH or absolute path)
    pub ffmpeg: String,
    /// ffmpeg input format, e.g. "v4l2", "avfoundation", "dshow"
    pub input_format: String,
    /// Device path, index or name as the input format expects it
    pub device: String,
    /// How long ffmpeg gets to finish the file after a stop before it is killed
    pub stop_grace_ms: u64,
}

impl Default for CameraConfig {
    fn default() -> Self {
        #[cfg(target_os = "macos")]
        let (input_format, device) = ("avfoundation", "0");
        #[cfg(target_os = "windows")]
        let (input_format, device) = ("dshow", "video=Integrated Camera");
        #[cfg(not(any(target_os = "macos", target_os = "windows")))]
        let (input_format, device) = ("v4l2", "/dev/video0");

        Self {
            ffmpeg: "ffmpeg".into(),
            input_format: input_format.into(),
            device: device.into(),
            stop_grace_ms: 3000,
        }
    }
}

impl CameraConfig {
    pub fn stop_grace(&self) -> Duration {
        Duration::from_millis(self.stop_grace_ms)
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server_url: String,
    pub camera: CameraConfig,
    /// Download each processed video into `output_dir`.
    pub save_videos: bool,
    pub output_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.into(),
            camera: CameraConfig::default(),
            save_videos: false,
            output_dir: None,
        }
    }
}

impl Config {
    /// Directory: ~/.config/posture-capture/
    fn dir() -> PathBuf {
        let mut p = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        p.push("posture-capture");
        p
    }

    fn path() -> PathBuf {
        Self::dir().join("config.json")
    }

    /// Load from disk, returning defaults if the file is invalid. A missing
    /// file is created with the defaults so there is something to edit.
    pub fn load() -> Self {
        let path = Self::path();
        match fs::read_to_string(&path) {
            Ok(data) => Self::from_json(&data),
            Err(_) => {
                let config = Self::default();
                match config.save() {
                    Ok(()) => log::info!("Wrote default config to {}", path.display()),
                    Err(e) => log::warn!("Failed to save config: {e}"),
                }
                config
            }
        }
    }

    fn from_json(data: &str) -> Self {
        serde_json::from_str(data).unwrap_or_else(|e| {
            log::warn!("Ignoring invalid config: {e}");
            Self::default()
        })
    }

    /// Persist to disk.
    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        let dir = Self::dir();
        fs::create_dir_all(&dir)?;
        let data = serde_json::to_string_pretty(self)?;
        fs::write(Self::path(), data)?;
        Ok(())
    }

    /// `POST` target for uploads.
    pub fn analyze_endpoint(&self) -> String {
        format!("{}/analyze", normalize_url(&self.server_url))
    }

    /// Where downloaded result videos go.
    pub fn video_dir(&self) -> PathBuf {
        self.output_dir.clone().unwrap_or_else(|| {
            dirs::video_dir()
                .or_else(|| dirs::home_dir().map(|h| h.join("Videos")))
                .unwrap_or_else(|| PathBuf::from("."))
                .join("Posture Analyses")
        })
    }
}

/// Trim whitespace and trailing slashes; add https:// if no scheme is given.
fn normalize_url(url: &str) -> String {
    let url = url.trim().trim_end_matches('/');
    if !url.starts_with("http://") && !url.starts_with("https://") {
        format!("https://{url}")
    } else {
        url.to_string()
    }
}
