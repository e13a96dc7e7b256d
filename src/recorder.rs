use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::time::Instant;

use crate::capture::{
    CaptureBackend, CaptureDevice, CaptureError, LiveFeed, MediaRecorder, RecorderEvent,
};
use crate::config::CameraConfig;

const READ_BUF_SIZE: usize = 64 * 1024;

/// Camera backend that records through an `ffmpeg` subprocess.
/// The recorder writes WebM (VP8) to stdout; each read becomes one chunk.
pub struct FfmpegCamera {
    config: CameraConfig,
}

impl FfmpegCamera {
    pub fn new(config: CameraConfig) -> Self {
        Self { config }
    }
}

#[async_trait(?Send)]
impl CaptureBackend for FfmpegCamera {
    async fn acquire(&self) -> Result<Box<dyn CaptureDevice>, CaptureError> {
        let handle = open_device(&self.config.device).await?;
        log::info!(
            "Camera acquired: {} ({})",
            self.config.device,
            self.config.input_format
        );
        Ok(Box::new(FfmpegDevice {
            config: self.config.clone(),
            feed: LiveFeed::new(&self.config.device),
            handle,
            control: None,
        }))
    }
}

/// Open the device node so permission problems surface before recording.
#[cfg(target_os = "linux")]
async fn open_device(path: &str) -> Result<Option<tokio::fs::File>, CaptureError> {
    match tokio::fs::File::open(path).await {
        Ok(file) => Ok(Some(file)),
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            Err(CaptureError::Denied(format!("{path}: {e}")))
        }
        Err(e) => Err(CaptureError::Unavailable(format!("{path}: {e}"))),
    }
}

// avfoundation and dshow address cameras by name or index, not by a path.
#[cfg(not(target_os = "linux"))]
async fn open_device(_path: &str) -> Result<Option<tokio::fs::File>, CaptureError> {
    Ok(None)
}

/// Requests from the session side to the task that owns the ffmpeg process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Signal {
    /// Send `q` and give ffmpeg the grace period to finish the file.
    Stop,
    /// The device was released. Kills the process unless a stop is
    /// already winding down.
    Release,
    /// Kill the process now.
    Kill,
}

struct FfmpegDevice {
    config: CameraConfig,
    feed: LiveFeed,
    handle: Option<tokio::fs::File>,
    control: Option<async_channel::Sender<Signal>>,
}

impl CaptureDevice for FfmpegDevice {
    fn feed(&self) -> LiveFeed {
        self.feed.clone()
    }

    fn start_recorder(
        &mut self,
        events: async_channel::Sender<RecorderEvent>,
    ) -> Result<Box<dyn MediaRecorder>, CaptureError> {
        if !self.feed.is_live() {
            return Err(CaptureError::Unavailable("device already released".into()));
        }

        let mut child = Command::new(&self.config.ffmpeg)
            .args(ffmpeg_args(&self.config))
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                CaptureError::Recorder(format!("failed to spawn {}: {e}", self.config.ffmpeg))
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| CaptureError::Recorder("ffmpeg stdout not captured".into()))?;
        let stdin = child.stdin.take();

        let (control_tx, control_rx) = async_channel::unbounded();
        let active = Arc::new(AtomicBool::new(true));
        tokio::spawn(supervise(
            Process {
                child,
                stdout,
                stdin,
            },
            control_rx,
            events,
            self.config.stop_grace(),
            active.clone(),
        ));

        self.control = Some(control_tx.clone());
        Ok(Box::new(FfmpegRecorder {
            control: control_tx,
            active,
        }))
    }

    fn release(&mut self) {
        if let Some(control) = self.control.take() {
            let _ = control.try_send(Signal::Release);
        }
        if self.handle.take().is_some() || self.feed.is_live() {
            log::info!("Camera released: {}", self.config.device);
        }
        self.feed.revoke();
    }
}

struct FfmpegRecorder {
    control: async_channel::Sender<Signal>,
    active: Arc<AtomicBool>,
}

impl MediaRecorder for FfmpegRecorder {
    fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Ask ffmpeg to finish the file. It flushes the container and exits,
    /// which closes stdout and ends the supervisor. If it is still running
    /// after the grace period it is killed.
    fn request_stop(&mut self) {
        let _ = self.control.try_send(Signal::Stop);
    }

    fn terminate(&mut self) {
        let _ = self.control.try_send(Signal::Kill);
    }
}

struct Process {
    child: Child,
    stdout: ChildStdout,
    stdin: Option<ChildStdin>,
}

/// Own the ffmpeg process: forward stdout as chunks, act on control
/// signals, and make sure the process is gone before `Stopped` is sent.
async fn supervise(
    mut process: Process,
    control: async_channel::Receiver<Signal>,
    events: async_channel::Sender<RecorderEvent>,
    grace: Duration,
    active: Arc<AtomicBool>,
) {
    let mut buf = vec![0u8; READ_BUF_SIZE];
    let mut deadline: Option<Instant> = None;
    let mut listening = true;
    let mut kill = false;

    loop {
        let at = deadline;
        let grace_expired = async move {
            match at {
                Some(at) => tokio::time::sleep_until(at).await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            read = process.stdout.read(&mut buf) => match read {
                Ok(0) => break,
                Ok(n) => {
                    if events.send(RecorderEvent::Chunk(buf[..n].to_vec())).await.is_err() {
                        kill = true;
                        break;
                    }
                }
                Err(e) => {
                    log::error!("Recorder read error: {e}");
                    kill = true;
                    break;
                }
            },
            signal = control.recv(), if listening => match signal {
                Ok(Signal::Stop) => {
                    if let Some(mut stdin) = process.stdin.take() {
                        if let Err(e) = stdin.write_all(b"q").await {
                            log::warn!("Failed to signal ffmpeg to stop: {e}");
                        }
                    }
                    deadline.get_or_insert_with(|| Instant::now() + grace);
                }
                Ok(Signal::Kill) => {
                    kill = true;
                    break;
                }
                Ok(Signal::Release) | Err(_) => {
                    if deadline.is_none() {
                        kill = true;
                        break;
                    }
                    listening = signal.is_ok();
                }
            },
            () = grace_expired => {
                log::warn!("ffmpeg still running {grace:?} after stop, killing it");
                kill = true;
                break;
            }
        }
    }

    if kill {
        if let Err(e) = process.child.start_kill() {
            log::debug!("ffmpeg already gone: {e}");
        }
    }

    match tokio::time::timeout(grace, process.child.wait()).await {
        Ok(Ok(status)) if !status.success() && !kill => log::warn!("ffmpeg exited with {status}"),
        Ok(Err(e)) => log::warn!("Failed to reap ffmpeg: {e}"),
        Err(_) => {
            log::warn!("ffmpeg closed its output but did not exit, killing it");
            let _ = process.child.start_kill();
            let _ = process.child.wait().await;
        }
        _ => {}
    }

    active.store(false, Ordering::Release);
    let _ = events.send(RecorderEvent::Stopped).await;
}

fn ffmpeg_args(config: &CameraConfig) -> Vec<String> {
    [
        "-hide_banner",
        "-loglevel",
        "error",
        "-f",
        config.input_format.as_str(),
        "-i",
        config.device.as_str(),
        "-an",
        "-c:v",
        "libvpx",
        "-deadline",
        "realtime",
        "-b:v",
        "1M",
        "-f",
        "webm",
        "pipe:1",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
