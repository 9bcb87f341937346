//! Camera access – the device side of a recording.
//!
//! [`Camera::open`] stands for the permission prompt; a grant yields the
//! hardware tracks plus the recorder's event stream.  [`FfmpegCamera`] spawns
//! `ffmpeg` as a child process and reads the encoded WebM from its stdout.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use stickframes_common::config::Config;

use crate::error::PipelineError;

/// Callbacks of the native recorder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecorderEvent {
    /// One encoded chunk; may be empty.
    DataAvailable(Vec<u8>),
    /// The encoder has flushed its last chunk.
    Stopped,
}

pub type RecorderEvents = mpsc::UnboundedReceiver<RecorderEvent>;

/// A live camera stream with an attached encoder.
pub trait MediaStream {
    /// Ask the encoder to finish.  Remaining chunks and then
    /// [`RecorderEvent::Stopped`] follow on the event channel.
    fn request_stop(&mut self);

    /// Release the camera hardware.  Safe to call more than once.
    fn stop_tracks(&mut self);
}

/// What a granted permission prompt hands back.
pub struct GrantedStream {
    pub tracks: Box<dyn MediaStream>,
    pub events: RecorderEvents,
}

#[async_trait(?Send)]
pub trait Camera {
    /// Request camera access.  Fails with [`PipelineError::Permission`] when
    /// access is denied or no camera is available; nothing is retained then.
    async fn open(&self) -> Result<GrantedStream, PipelineError>;
}

// ── ffmpeg ───────────────────────────────────────────────────────────────

const READ_CHUNK: usize = 64 * 1024;

/// Records the webcam through `ffmpeg` (VP8 in a WebM container on stdout).
pub struct FfmpegCamera {
    device: String,
    input_format: String,
}

impl FfmpegCamera {
    pub fn new(device: impl Into<String>, input_format: impl Into<String>) -> Self {
        FfmpegCamera {
            device: device.into(),
            input_format: input_format.into(),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.camera_device, &config.camera_input_format)
    }
}

#[async_trait(?Send)]
impl Camera for FfmpegCamera {
    async fn open(&self) -> Result<GrantedStream, PipelineError> {
        let mut cmd = Command::new("ffmpeg");
        cmd.args(["-hide_banner", "-loglevel", "error"]);
        cmd.args(["-f", &self.input_format, "-i", &self.device]);
        cmd.args([
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
        ]);
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| {
            PipelineError::Permission(format!("cannot start ffmpeg: {e}"))
        })?;

        // Drain stderr so device errors reach the log and the pipe never
        // fills up and blocks ffmpeg.
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    if !line.is_empty() {
                        warn!("[ffmpeg] {line}");
                    }
                }
                debug!("ffmpeg stderr stream ended");
            });
        }

        // Give ffmpeg a moment to fail on a missing or busy device before
        // declaring the camera granted.
        tokio::time::sleep(Duration::from_millis(500)).await;
        match child.try_wait() {
            Ok(Some(status)) => {
                return Err(PipelineError::Permission(format!(
                    "ffmpeg exited immediately with {status} – check CAMERA_DEVICE ({})",
                    self.device
                )));
            }
            Ok(None) => {}
            Err(e) => warn!("Cannot check ffmpeg status: {e}"),
        }

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| PipelineError::Permission("ffmpeg stdout unavailable".into()))?;
        let stdin = child.stdin.take();

        let (tx, events) = mpsc::unbounded_channel();
        tokio::spawn(async move {
            let mut stdout = stdout;
            let mut buf = vec![0u8; READ_CHUNK];
            loop {
                match stdout.read(&mut buf).await {
                    Ok(0) => break,
                    Ok(n) => {
                        if tx.send(RecorderEvent::DataAvailable(buf[..n].to_vec())).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        warn!("Cannot read ffmpeg output: {e}");
                        break;
                    }
                }
            }
            let _ = tx.send(RecorderEvent::Stopped);
        });

        info!(
            "Camera {} opened (ffmpeg pid={:?}, format={})",
            self.device,
            child.id(),
            self.input_format
        );

        Ok(GrantedStream {
            tracks: Box::new(FfmpegStream {
                child,
                stdin,
                released: false,
            }),
            events,
        })
    }
}

struct FfmpegStream {
    child: Child,
    stdin: Option<ChildStdin>,
    released: bool,
}

impl MediaStream for FfmpegStream {
    fn request_stop(&mut self) {
        // `q` makes ffmpeg finish the container and exit, which closes
        // stdout and emits `Stopped`.
        match self.stdin.take() {
            Some(mut stdin) => {
                tokio::spawn(async move {
                    if let Err(e) = stdin.write_all(b"q").await {
                        warn!("Cannot signal ffmpeg to stop: {e}");
                    }
                });
            }
            None => self.stop_tracks(),
        }
    }

    fn stop_tracks(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.stdin = None;
        match self.child.try_wait() {
            Ok(Some(status)) => debug!("ffmpeg already exited with {status}"),
            Ok(None) => {
                if let Err(e) = self.child.start_kill() {
                    warn!("Cannot stop ffmpeg: {e}");
                } else {
                    info!("Camera released");
                }
            }
            Err(e) => warn!("Cannot check ffmpeg status: {e}"),
        }
    }
}

impl Drop for FfmpegStream {
    fn drop(&mut self) {
        self.stop_tracks();
    }
}
