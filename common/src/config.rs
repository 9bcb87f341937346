//! Configuration parsing – reads a KEY=VALUE file (`stickframes.conf`).
//!
//! Every key is optional; a missing file means "run with the defaults".

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::info;

/// Client configuration for the capture-and-retrieval pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    // ── backend ──────────────────────────────────────────────────────
    /// Root every backend path and landmark locator is resolved against.
    pub api_root: String,
    pub upload_path: String,
    /// Cheap endpoint hit once at startup to decide whether the backend runs.
    pub probe_path: String,
    pub request_timeout_secs: u64,
    pub probe_timeout_secs: u64,
    pub max_upload_mb: u64,

    // ── camera ───────────────────────────────────────────────────────
    pub camera_device: String,
    /// ffmpeg input format for the camera (`v4l2`, `avfoundation`, ...).
    pub camera_input_format: String,
    pub recording_mime: String,

    // ── landmark export ──────────────────────────────────────────────
    pub output_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            api_root: "http://127.0.0.1:5000".into(),
            upload_path: "/upload".into(),
            probe_path: "/download/test.txt".into(),
            request_timeout_secs: 300,
            probe_timeout_secs: 5,
            max_upload_mb: 500,
            camera_device: "/dev/video0".into(),
            camera_input_format: "v4l2".into(),
            recording_mime: "video/webm".into(),
            output_dir: PathBuf::from("."),
        }
    }
}

impl Config {
    /// Default config path.
    pub fn default_path() -> &'static str {
        "/etc/stickframes/stickframes.conf"
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }
}

/// Parse a `KEY=VALUE` configuration file.
///
/// Lines starting with `#` are comments.  Values may be optionally
/// double-quoted.  Unknown keys are silently ignored.
pub fn load(path: &Path) -> Result<Config> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Cannot read config: {}", path.display()))?;

    let config = from_map(&parse_conf(&text));
    info!("Loaded config from {}", path.display());
    Ok(config)
}

/// Like [`load`], but a file that does not exist yields [`Config::default`].
pub fn load_or_default(path: &Path) -> Result<Config> {
    if !path.exists() {
        info!("No config at {} – using defaults", path.display());
        return Ok(Config::default());
    }
    load(path)
}

fn from_map(map: &HashMap<String, String>) -> Config {
    let defaults = Config::default();

    let get = |key: &str| -> Option<String> {
        map.get(key).filter(|v| !v.is_empty()).cloned()
    };
    let get_u64 = |key: &str, default: u64| -> u64 {
        get(key).and_then(|v| v.parse().ok()).unwrap_or(default)
    };

    Config {
        api_root: get("API_ROOT")
            .map(|root| root.trim_end_matches('/').to_string())
            .unwrap_or(defaults.api_root),
        upload_path: get("UPLOAD_PATH").unwrap_or(defaults.upload_path),
        probe_path: get("PROBE_PATH").unwrap_or(defaults.probe_path),
        request_timeout_secs: get_u64("REQUEST_TIMEOUT_SECS", defaults.request_timeout_secs),
        probe_timeout_secs: get_u64("PROBE_TIMEOUT_SECS", defaults.probe_timeout_secs),
        max_upload_mb: get_u64("MAX_UPLOAD_MB", defaults.max_upload_mb),

        camera_device: get("CAMERA_DEVICE").unwrap_or(defaults.camera_device),
        camera_input_format: get("CAMERA_INPUT_FORMAT").unwrap_or(defaults.camera_input_format),
        recording_mime: get("RECORDING_MIME").unwrap_or(defaults.recording_mime),

        output_dir: get("OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.output_dir),
    }
}

/// Parse `KEY=VALUE` lines into a map, stripping optional double-quotes.
fn parse_conf(text: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some((key, val)) = line.split_once('=') {
            let key = key.trim();
            let val = val.trim().trim_matches('"');
            map.insert(key.to_string(), val.to_string());
        }
    }
    map
}

// ─── tests ───────────────────────────────────────────────────────────────
