//! HTTP client for the processing backend.
//!
//! The orchestrator and the availability probe only see the [`Backend`]
//! trait; [`HttpBackend`] is the reqwest implementation used by the binary.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use tracing::{debug, info};

use stickframes_common::config::Config;
use stickframes_common::landmarks::LandmarkKind;
use stickframes_common::protocol::{resolve_locator, UploadResult, VIDEO_FIELD};

use crate::error::{RetrievalError, UploadError};
use crate::media::VideoBlob;

#[async_trait(?Send)]
pub trait Backend {
    /// Lightweight reachability request.  Any HTTP response counts as
    /// reachable; only transport failures are errors.
    async fn ping(&self) -> Result<()>;

    /// Submit a video to the ingest endpoint and parse the returned locators.
    async fn upload(&self, video: &VideoBlob) -> Result<UploadResult, UploadError>;

    /// Fetch the raw landmark text behind one locator.
    async fn fetch_landmarks(
        &self,
        kind: LandmarkKind,
        locator: &str,
    ) -> Result<String, RetrievalError>;
}

pub struct HttpBackend {
    client: reqwest::Client,
    api_root: String,
    upload_path: String,
    probe_path: String,
    probe_timeout: std::time::Duration,
}

impl HttpBackend {
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .context("Cannot create HTTP client")?;

        Ok(HttpBackend {
            client,
            api_root: config.api_root.clone(),
            upload_path: config.upload_path.clone(),
            probe_path: config.probe_path.clone(),
            probe_timeout: config.probe_timeout(),
        })
    }
}

#[async_trait(?Send)]
impl Backend for HttpBackend {
    async fn ping(&self) -> Result<()> {
        let url = resolve_locator(&self.api_root, &self.probe_path);
        let resp = self
            .client
            .get(&url)
            .timeout(self.probe_timeout)
            .send()
            .await
            .with_context(|| format!("GET {url}"))?;

        debug!("Probe {url} answered {}", resp.status());
        Ok(())
    }

    async fn upload(&self, video: &VideoBlob) -> Result<UploadResult, UploadError> {
        let url = resolve_locator(&self.api_root, &self.upload_path);
        let part = Part::bytes(video.data.clone())
            .file_name(video.file_name.clone())
            .mime_str(&video.mime)
            .map_err(|e| UploadError::Transport(format!("invalid MIME type {}: {e}", video.mime)))?;
        let form = Form::new().part(VIDEO_FIELD, part);

        info!(
            "Uploading {} ({} bytes, {}) to {url}",
            video.file_name,
            video.len(),
            video.mime
        );

        let resp = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| UploadError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(UploadError::Status(status.to_string()));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| UploadError::Transport(e.to_string()))?;
        UploadResult::parse(&body).map_err(|e| UploadError::Malformed(e.to_string()))
    }

    async fn fetch_landmarks(
        &self,
        kind: LandmarkKind,
        locator: &str,
    ) -> Result<String, RetrievalError> {
        let url = resolve_locator(&self.api_root, locator);
        let transport = |e: reqwest::Error| RetrievalError::Transport {
            kind,
            reason: e.to_string(),
        };

        let resp = self.client.get(&url).send().await.map_err(transport)?;
        let status = resp.status();
        if !status.is_success() {
            return Err(RetrievalError::Status {
                kind,
                status: status.to_string(),
            });
        }

        let text = resp.text().await.map_err(transport)?;
        debug!("Fetched {kind} landmarks from {url} ({} bytes)", text.len());
        Ok(text)
    }
}
