//! Forensic analysis pipeline.
//!
//! [`ForensicAnalyzer::analyze`] is the single entry point a UI needs:
//!
//! 1. start a [`ProgressFeed`] with the mode's phase lines
//! 2. ingest the media (fetching it if it is a URL)
//! 3. build the request against the fixed output contract
//! 4. issue the one engine call
//! 5. stop the feed, on every exit path
//! 6. decode, default and classify the response
//!
//! Nothing is retried and no timeout is applied here; callers may layer
//! either on top.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use super::contract::{self, AUDIT_COMPLETE_MESSAGE, FETCHING_URL_MESSAGE};
use super::engine::{EngineError, ReasoningEngine};
use super::ingest::{IngestionError, MediaIngestor, MediaInput};
use crate::progress::{ProgressFeed, ProgressSink, DEFAULT_TICK_INTERVAL};
use crate::scan::{decode_response, AnalysisResult, MediaMode};

/// Errors that end an analysis.
#[derive(Error, Debug, Clone)]
pub enum AnalysisError {
    #[error("ingestion failed: {0}")]
    Ingestion(#[from] IngestionError),

    #[error("engine call failed: {0}")]
    Engine(#[from] EngineError),

    #[error("decode failure: {0}")]
    Decode(String),
}

/// Orchestrates ingestion, the engine call, progress reporting and decoding.
pub struct ForensicAnalyzer {
    engine: Arc<dyn ReasoningEngine>,
    ingestor: MediaIngestor,
    tick_interval: Duration,
}

impl ForensicAnalyzer {
    pub fn new(engine: Arc<dyn ReasoningEngine>, ingestor: MediaIngestor) -> Self {
        Self {
            engine,
            ingestor,
            tick_interval: DEFAULT_TICK_INTERVAL,
        }
    }

    /// Set the cadence of progress lines.
    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    /// Analyze one media input.
    ///
    /// `on_progress` receives phase lines while the engine works, then exactly
    /// one terminal line (success or the error text) after the feed has been
    /// stopped.
    pub async fn analyze(
        &self,
        input: &MediaInput,
        mode: MediaMode,
        on_progress: ProgressSink,
    ) -> Result<AnalysisResult, AnalysisError> {
        let feed = ProgressFeed::start(
            contract::phase_messages(mode).iter().copied(),
            self.tick_interval,
            Arc::clone(&on_progress),
        );

        let settled = self.dispatch(input, mode, &on_progress).await;
        feed.stop();

        let outcome = settled.and_then(|text| decode_response(&text));

        match &outcome {
            Ok(result) => {
                on_progress(AUDIT_COMPLETE_MESSAGE);
                tracing::info!(
                    engine = self.engine.name(),
                    mode = %mode,
                    score = result.probability_score,
                    status = %result.status,
                    markers = result.markers.len(),
                    "Forensic audit complete"
                );
            }
            Err(e) => {
                tracing::warn!(
                    engine = self.engine.name(),
                    mode = %mode,
                    error = %e,
                    "Forensic audit failed"
                );
                on_progress(&e.to_string());
            }
        }

        outcome
    }

    /// Ingest and call the engine. Returns the engine's raw text.
    async fn dispatch(
        &self,
        input: &MediaInput,
        mode: MediaMode,
        on_progress: &ProgressSink,
    ) -> Result<String, AnalysisError> {
        if input.is_url() {
            on_progress(FETCHING_URL_MESSAGE);
        }

        let media = self.ingestor.ingest(input).await?;
        tracing::debug!(
            mode = %mode,
            mime_type = %media.mime_type,
            bytes = media.byte_len,
            "Media ingested"
        );

        let request = contract::build_request(media, mode);
        let text = self.engine.generate(&request).await?;
        Ok(text)
    }
}
