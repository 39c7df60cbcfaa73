//! Media ingestion.
//!
//! Turns user input (in-memory bytes or a remote URL) into a base64 payload
//! plus MIME type ready for the reasoning engine. There is no size limit and
//! no retry here: a failed fetch ends the ingestion call.

use std::path::Path;

use base64::Engine;
use thiserror::Error;

/// MIME type used when nothing better is known.
pub const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

/// Display name for URL input whose path has no usable last segment.
pub const FALLBACK_REMOTE_NAME: &str = "remote-media";

/// Display name for byte input without a file name.
pub const FALLBACK_UPLOAD_NAME: &str = "upload";

/// Errors that can occur while preparing media for transport.
#[derive(Error, Debug, Clone)]
pub enum IngestionError {
    #[error("invalid media URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error(
        "could not fetch {url}: {reason}. Make sure the link is a direct, publicly \
         reachable media file; platform and CDN page links are not supported"
    )]
    Fetch { url: String, reason: String },

    #[error(
        "fetching {url} returned HTTP {status}. Make sure the link is a direct, publicly \
         reachable media file; platform and CDN page links are not supported"
    )]
    Status { url: String, status: u16 },

    #[error("failed to read media bytes: {0}")]
    Read(String),

    #[error("I/O error: {0}")]
    Io(String),
}

/// User-supplied media, before ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaInput {
    /// Uploaded bytes with their declared content type.
    Bytes {
        data: Vec<u8>,
        mime_type: String,
        filename: Option<String>,
    },
    /// A direct link to a publicly reachable media file.
    Url(String),
}

impl MediaInput {
    pub fn upload(data: Vec<u8>, mime_type: impl Into<String>, filename: Option<String>) -> Self {
        MediaInput::Bytes {
            data,
            mime_type: mime_type.into(),
            filename,
        }
    }

    pub fn url(url: impl Into<String>) -> Self {
        MediaInput::Url(url.into())
    }

    /// Read a local file as upload input, guessing its MIME type from the extension.
    pub async fn from_path(path: &Path) -> Result<Self, IngestionError> {
        let data = tokio::fs::read(path)
            .await
            .map_err(|e| IngestionError::Io(format!("failed to read {}: {}", path.display(), e)))?;

        let mime_type = mime_guess::from_path(path)
            .first()
            .map(|m| m.essence_str().to_string())
            .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string());

        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned());

        Ok(MediaInput::Bytes {
            data,
            mime_type,
            filename,
        })
    }

    /// Name shown in history: the upload's file name or the URL's last path segment.
    pub fn display_name(&self) -> String {
        match self {
            MediaInput::Bytes { filename, .. } => filename
                .as_deref()
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .unwrap_or(FALLBACK_UPLOAD_NAME)
                .to_string(),
            MediaInput::Url(url) => filename_from_url(url),
        }
    }

    /// MIME type known before ingestion, if any.
    pub fn declared_mime(&self) -> Option<&str> {
        match self {
            MediaInput::Bytes { mime_type, .. } => Some(mime_type.as_str()),
            MediaInput::Url(_) => None,
        }
    }

    pub fn is_url(&self) -> bool {
        matches!(self, MediaInput::Url(_))
    }
}

/// Transport-ready media.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestedMedia {
    /// Base64 (standard alphabet, padded) encoding of the media bytes.
    pub payload: String,
    pub mime_type: String,
    /// Size of the decoded media in bytes.
    pub byte_len: usize,
}

/// Normalizes [`MediaInput`] into [`IngestedMedia`].
#[derive(Debug, Clone)]
pub struct MediaIngestor {
    client: reqwest::Client,
}

impl MediaIngestor {
    /// Create an ingestor with its own HTTP client.
    pub fn new() -> Result<Self, IngestionError> {
        let client = reqwest::Client::builder()
            .connect_timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| IngestionError::Io(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }

    /// Create an ingestor around an existing HTTP client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Ingest the input. URL input performs exactly one network fetch.
    pub async fn ingest(&self, input: &MediaInput) -> Result<IngestedMedia, IngestionError> {
        match input {
            MediaInput::Bytes { data, mime_type, .. } => {
                let mime_type =
                    normalize_mime(mime_type).unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string());
                Ok(encode_media(data, mime_type))
            }
            MediaInput::Url(url) => {
                let (data, mime_type) = self.fetch(url).await?;
                Ok(encode_media(&data, mime_type))
            }
        }
    }

    async fn fetch(&self, raw_url: &str) -> Result<(Vec<u8>, String), IngestionError> {
        let url = url::Url::parse(raw_url.trim()).map_err(|e| IngestionError::InvalidUrl {
            url: raw_url.to_string(),
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(IngestionError::InvalidUrl {
                url: raw_url.to_string(),
                reason: format!("unsupported scheme '{}'", url.scheme()),
            });
        }

        tracing::debug!(url = %url, "Fetching remote media");

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| IngestionError::Fetch {
                url: raw_url.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(IngestionError::Status {
                url: raw_url.to_string(),
                status: status.as_u16(),
            });
        }

        let header_mime = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(normalize_mime);

        let bytes = response
            .bytes()
            .await
            .map_err(|e| IngestionError::Read(format!("{raw_url}: {e}")))?;

        let mime_type = header_mime
            .or_else(|| {
                mime_guess::from_path(url.path())
                    .first()
                    .map(|m| m.essence_str().to_string())
            })
            .unwrap_or_else(|| DEFAULT_MIME_TYPE.to_string());

        tracing::debug!(
            url = %url,
            mime_type = %mime_type,
            bytes = bytes.len(),
            "Fetched remote media"
        );

        Ok((bytes.to_vec(), mime_type))
    }
}

/// Base64-encode media bytes for transport.
pub fn encode_media(data: &[u8], mime_type: String) -> IngestedMedia {
    IngestedMedia {
        payload: base64::engine::general_purpose::STANDARD.encode(data),
        mime_type,
        byte_len: data.len(),
    }
}

/// Derive a display name from a URL's last path segment.
pub fn filename_from_url(raw_url: &str) -> String {
    url::Url::parse(raw_url.trim())
        .ok()
        .and_then(|url| {
            url.path_segments()
                .and_then(|segments| segments.filter(|s| !s.is_empty()).last().map(str::to_string))
        })
        .unwrap_or_else(|| FALLBACK_REMOTE_NAME.to_string())
}

/// Lowercase a MIME type and strip any parameters ("video/mp4; codecs=..." -> "video/mp4").
fn normalize_mime(raw: &str) -> Option<String> {
    let base = raw.split(';').next().unwrap_or("").trim().to_lowercase();
    if base.is_empty() {
        None
    } else {
        Some(base)
    }
}
