//! Scan record model
//!
//! The data contract shared by the analysis pipeline, the history store and
//! any presentation layer:
//!
//! - **AnalysisResult**: decoded output of one engine call (score, status,
//!   summary, markers, raw payload)
//! - **NewScan**: the save input assembled by the caller after a successful
//!   analysis
//! - **ScanRecord**: a persisted, addressable history entry
//!
//! Status tiers are derived from the probability score by [`classify`].

pub mod decode;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::media::ingest::MediaInput;

pub use decode::{decode_response, DEFAULT_SUMMARY};

/// Scores strictly above this are classified as fake.
pub const FAKE_THRESHOLD: f64 = 75.0;

/// Scores strictly above this (and not fake) are classified as suspicious.
pub const SUSPICIOUS_THRESHOLD: f64 = 40.0;

/// Kind of media being audited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaMode {
    Video,
    Image,
}

impl MediaMode {
    /// Infer the mode from a MIME type string.
    pub fn from_mime(mime: &str) -> Option<Self> {
        let lower = mime.to_lowercase();
        if lower.starts_with("video/") {
            Some(MediaMode::Video)
        } else if lower.starts_with("image/") {
            Some(MediaMode::Image)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaMode::Video => "video",
            MediaMode::Image => "image",
        }
    }
}

impl std::fmt::Display for MediaMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MediaMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "video" => Ok(MediaMode::Video),
            "image" => Ok(MediaMode::Image),
            other => Err(format!("unknown media mode: {other} (expected video or image)")),
        }
    }
}

/// Where the media came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Upload,
    Url,
}

/// Severity of a single forensic marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Low,
    Medium,
    High,
}

impl Severity {
    /// Parse a severity label; anything unrecognized falls back to `Low`.
    pub fn parse_lenient(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "high" => Severity::High,
            "medium" => Severity::Medium,
            _ => Severity::Low,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
        }
    }
}

/// Three-way verdict tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    Clean,
    Suspicious,
    Fake,
}

impl ScanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScanStatus::Clean => "clean",
            ScanStatus::Suspicious => "suspicious",
            ScanStatus::Fake => "fake",
        }
    }
}

impl std::fmt::Display for ScanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a probability score into a status tier.
///
/// `> 75` is fake, `(40, 75]` is suspicious, `<= 40` is clean.
pub fn classify(score: f64) -> ScanStatus {
    if score > FAKE_THRESHOLD {
        ScanStatus::Fake
    } else if score > SUSPICIOUS_THRESHOLD {
        ScanStatus::Suspicious
    } else {
        ScanStatus::Clean
    }
}

/// One localized anomaly indicator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForensicMarker {
    /// `MM:SS` offset for video, region label for images.
    pub position: String,
    pub label: String,
    #[serde(default)]
    pub severity: Severity,
    pub description: String,
}

/// Decoded output of a single engine call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// Probability of manipulation, 0.00 to 100.00.
    pub probability_score: f64,
    pub status: ScanStatus,
    pub summary: String,
    pub markers: Vec<ForensicMarker>,
    /// Full decoded payload, kept for audit only.
    pub raw: serde_json::Value,
}

/// Save input for the history store. `id` and `timestamp` are assigned on save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewScan {
    pub filename: String,
    pub mode: MediaMode,
    pub source_type: SourceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    pub probability_score: f64,
    pub status: ScanStatus,
    pub summary: String,
    pub markers: Vec<ForensicMarker>,
    #[serde(default)]
    pub raw: serde_json::Value,
}

impl NewScan {
    /// Assemble a save input from a finished analysis and the input it came from.
    pub fn from_analysis(result: AnalysisResult, input: &MediaInput, mode: MediaMode) -> Self {
        let (source_type, source_url) = match input {
            MediaInput::Bytes { .. } => (SourceType::Upload, None),
            MediaInput::Url(url) => (SourceType::Url, Some(url.clone())),
        };

        Self {
            filename: input.display_name(),
            mode,
            source_type,
            source_url,
            probability_score: result.probability_score,
            status: result.status,
            summary: result.summary,
            markers: result.markers,
            raw: result.raw,
        }
    }
}

/// A persisted history entry. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRecord {
    pub id: Uuid,
    pub filename: String,
    pub timestamp: DateTime<Utc>,
    pub mode: MediaMode,
    pub source_type: SourceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    pub probability_score: f64,
    pub status: ScanStatus,
    pub summary: String,
    pub markers: Vec<ForensicMarker>,
    #[serde(default)]
    pub raw: serde_json::Value,
}

impl ScanRecord {
    /// Stamp a save input with its store-assigned identity.
    pub fn from_new(scan: NewScan, id: Uuid, timestamp: DateTime<Utc>) -> Self {
        let NewScan {
            filename,
            mode,
            source_type,
            source_url,
            probability_score,
            status,
            summary,
            markers,
            raw,
        } = scan;

        // source_url only travels with URL-sourced records
        let source_url = match source_type {
            SourceType::Url => source_url,
            SourceType::Upload => None,
        };

        Self {
            id,
            filename,
            timestamp,
            mode,
            source_type,
            source_url,
            probability_score,
            status,
            summary,
            markers,
            raw,
        }
    }
}
