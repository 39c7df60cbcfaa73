//! forensight library
//!
//! Orchestrates forensic authenticity audits of video and images: media
//! ingestion, a cosmetic progress feed, one call to a remote reasoning
//! engine, decoding of its structured verdict, and a bounded local history
//! of past scans.

pub mod cli;
pub mod config;
pub mod history;
pub mod logging;
pub mod media;
pub mod progress;
pub mod scan;
