//! In-memory video blobs handed to the uploader.

use std::path::Path;

use crate::error::UploadError;

/// File name the backend sees for a webcam recording.
pub const RECORDED_FILE_NAME: &str = "recorded-video.webm";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoBlob {
    pub data: Vec<u8>,
    pub mime: String,
    pub file_name: String,
}

impl VideoBlob {
    pub fn new(data: Vec<u8>, mime: impl Into<String>, file_name: impl Into<String>) -> Self {
        VideoBlob {
            data,
            mime: mime.into(),
            file_name: file_name.into(),
        }
    }

    /// Concatenate recorder chunks into one recording.
    pub fn from_chunks(chunks: Vec<Vec<u8>>, mime: &str) -> Self {
        let data = chunks.concat();
        VideoBlob::new(data, mime, RECORDED_FILE_NAME)
    }

    /// Read a user-selected video file.
    ///
    /// The size limit is checked against the file metadata before anything
    /// is read.
    pub async fn from_file(path: &Path, max_bytes: u64) -> Result<Self, UploadError> {
        let read_err = |e: std::io::Error| UploadError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        };

        let meta = tokio::fs::metadata(path).await.map_err(read_err)?;
        if meta.len() > max_bytes {
            return Err(UploadError::TooLarge {
                size: meta.len(),
                max: max_bytes,
            });
        }

        let data = tokio::fs::read(path).await.map_err(read_err)?;
        let file_name = path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();

        Ok(VideoBlob::new(data, mime_for(path), file_name))
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Guess a video MIME type from the file extension.
pub fn mime_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    match ext.as_str() {
        "mp4" | "m4v" => "video/mp4",
        "webm" => "video/webm",
        "mov" => "video/quicktime",
        "mkv" => "video/x-matroska",
        "avi" => "video/x-msvideo",
        _ => "application/octet-stream",
    }
}
