//! Media analysis module
//!
//! Turns arbitrary user input into a forensic verdict:
//!
//! - **MediaIngestor**: in-memory bytes or a direct URL to a base64 payload
//!   plus MIME type
//!   - One fetch per URL, no retry, no size limit
//!   - Failures explain that only direct, public media files work
//!
//! - **Contract**: the fixed structured-output schema, system instruction
//!   and per-mode prompts and phase lines
//!
//! - **ReasoningEngine**: the opaque remote capability, with a Gemini
//!   `generateContent` implementation
//!
//! - **ForensicAnalyzer**: runs the whole pipeline with a progress feed that
//!   is always stopped before the call returns
//!
//! # Example
//!
//! ```ignore
//! use forensight::media::{ForensicAnalyzer, GeminiEngine, MediaIngestor, MediaInput};
//! use forensight::scan::MediaMode;
//!
//! let engine = Arc::new(GeminiEngine::new(api_key)?);
//! let analyzer = ForensicAnalyzer::new(engine, MediaIngestor::new()?);
//!
//! let input = MediaInput::url("https://example.com/clip.mp4");
//! let result = analyzer
//!     .analyze(&input, MediaMode::Video, forensight::progress::sink(|line| eprintln!("{line}")))
//!     .await?;
//!
//! println!("{} ({:.2})", result.status, result.probability_score);
//! ```

pub mod analysis;
pub mod contract;
pub mod engine;
pub mod ingest;

// Re-export commonly used types
pub use analysis::{AnalysisError, ForensicAnalyzer};
pub use engine::{AnalysisRequest, EngineError, GeminiEngine, ReasoningEngine};
pub use ingest::{
    filename_from_url, IngestedMedia, IngestionError, MediaIngestor, MediaInput,
    DEFAULT_MIME_TYPE, FALLBACK_REMOTE_NAME,
};
