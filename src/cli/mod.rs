//! CLI subcommand definitions and handlers.
//!
//! Uses clap derive to define the subcommand hierarchy:
//! - `analyze <INPUT>` -- audit a local file or direct media URL and save it
//! - `history list|show` -- browse past scans
//! - `config show|path` -- inspect configuration
//! - `version` -- print build/version info

use std::path::Path;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde_json::Value;
use uuid::Uuid;

use crate::config::{self, Config};
use crate::history::{HistoryStore, JsonFileBackend};
use crate::media::{ForensicAnalyzer, GeminiEngine, MediaIngestor, MediaInput};
use crate::progress;
use crate::scan::{ForensicMarker, MediaMode, NewScan, ScanRecord, ScanStatus};

/// Forensic authenticity analysis for video and images.
#[derive(Parser, Debug)]
#[command(
    name = "forensight",
    version = env!("CARGO_PKG_VERSION"),
    about = "Forensight: deepfake and manipulation audits for video and images"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Audit a local media file or a direct http(s) media URL.
    Analyze {
        /// Local path or http(s) URL.
        input: String,

        /// Media kind; inferred from the file type when omitted.
        #[arg(short, long)]
        mode: Option<MediaMode>,

        /// Print the saved record as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Browse saved scans.
    #[command(subcommand)]
    History(HistoryCommand),

    /// Inspect configuration.
    #[command(subcommand)]
    Config(ConfigCommand),

    /// Print version, build date, and git commit information.
    Version,
}

#[derive(Subcommand, Debug)]
pub enum HistoryCommand {
    /// List saved scans, newest first.
    List {
        /// Print as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Print one saved scan in full.
    Show {
        /// Record id.
        id: Uuid,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the fully loaded configuration (secrets redacted) as JSON.
    Show,

    /// Print the resolved configuration file path.
    Path,
}

// ---------------------------------------------------------------------------
// Subcommand handlers
// ---------------------------------------------------------------------------

/// Secrets that should be redacted when printing config.
const SECRET_KEYS: &[&str] = &["apikey", "api_key", "token", "secret", "password"];

/// Run the `analyze` subcommand.
pub async fn handle_analyze(
    cfg: &Config,
    input: &str,
    mode: Option<MediaMode>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let media = resolve_input(input).await?;
    let mode = match mode.or_else(|| infer_mode(&media)) {
        Some(mode) => mode,
        None => {
            return Err(format!(
                "cannot tell whether {} is a video or an image; pass --mode video|image",
                media.display_name()
            )
            .into())
        }
    };

    let engine = Arc::new(GeminiEngine::from_config(&cfg.engine)?);
    let analyzer = ForensicAnalyzer::new(engine, MediaIngestor::new()?)
        .with_tick_interval(cfg.tick_interval());
    let store = open_history(cfg);

    let on_progress = progress::sink(|line| eprintln!("  {}", line));
    let result = analyzer.analyze(&media, mode, on_progress).await?;

    let output = save_scan(&store, NewScan::from_analysis(result, &media, mode), json).await;
    print!("{}", output.rendered);
    match output.error {
        Some(e) => Err(e.into()),
        None => Ok(()),
    }
}

/// What `analyze` prints, plus the history error if the scan was not kept.
struct SaveOutput {
    rendered: String,
    error: Option<String>,
}

/// Save a finished scan. A history failure still renders the verdict so a
/// completed engine call is never lost.
async fn save_scan(store: &HistoryStore, scan: NewScan, json: bool) -> SaveOutput {
    match store.save(scan.clone()).await {
        Ok(record) => SaveOutput {
            rendered: render(&record, json, || format_record(&record)),
            error: None,
        },
        Err(e) => {
            tracing::warn!(error = %e, filename = %scan.filename, "Scan not saved to history");
            SaveOutput {
                rendered: render(&scan, json, || format_unsaved(&scan)),
                error: Some(format!("scan was not saved to history: {e}")),
            }
        }
    }
}

fn render<T, F>(value: &T, json: bool, text: F) -> String
where
    T: serde::Serialize,
    F: FnOnce() -> String,
{
    if !json {
        return text();
    }
    match serde_json::to_string_pretty(value) {
        Ok(pretty) => format!("{pretty}\n"),
        Err(_) => text(),
    }
}

/// Run the `history list` subcommand.
pub async fn handle_history_list(
    cfg: &Config,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let records = open_history(cfg).list().await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    if records.is_empty() {
        println!("No scans yet.");
        return Ok(());
    }
    for record in &records {
        println!("{}", summary_line(record));
    }
    Ok(())
}

/// Run the `history show <id>` subcommand.
pub async fn handle_history_show(
    cfg: &Config,
    id: Uuid,
) -> Result<(), Box<dyn std::error::Error>> {
    match open_history(cfg).get(id).await? {
        Some(record) => {
            print!("{}", format_record(&record));
            Ok(())
        }
        None => Err(format!("no scan with id {} in history", id).into()),
    }
}

/// Run the `config show` subcommand.
pub fn handle_config_show(cfg: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let redacted = redact_secrets(serde_json::to_value(cfg)?);
    let pretty = serde_json::to_string_pretty(&redacted)?;
    println!("{}", pretty);
    Ok(())
}

/// Run the `config path` subcommand.
pub fn handle_config_path() {
    println!("{}", config::get_config_path().display());
}

/// Run the `version` subcommand.
pub fn handle_version() {
    println!("forensight {}", env!("CARGO_PKG_VERSION"));
    println!("  Build date: {}", env!("FORENSIGHT_BUILD_DATE"));
    println!("  Git commit: {}", env!("FORENSIGHT_GIT_HASH"));
    println!(
        "  Platform:   {} ({})",
        std::env::consts::OS,
        std::env::consts::ARCH
    );
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn open_history(cfg: &Config) -> HistoryStore {
    HistoryStore::new(
        Arc::new(JsonFileBackend::new(cfg.history_path())),
        cfg.history.capacity,
    )
}

fn is_remote(input: &str) -> bool {
    let lower = input.trim_start().to_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}

async fn resolve_input(input: &str) -> Result<MediaInput, Box<dyn std::error::Error>> {
    if is_remote(input) {
        Ok(MediaInput::url(input.trim()))
    } else {
        Ok(MediaInput::from_path(Path::new(input)).await?)
    }
}

/// Guess the mode from the declared MIME type, or from a URL's extension.
fn infer_mode(input: &MediaInput) -> Option<MediaMode> {
    match input {
        MediaInput::Bytes { mime_type, .. } => MediaMode::from_mime(mime_type),
        MediaInput::Url(raw) => {
            let path = url::Url::parse(raw).ok()?.path().to_string();
            let guessed = mime_guess::from_path(path).first()?;
            MediaMode::from_mime(guessed.essence_str())
        }
    }
}

fn summary_line(record: &ScanRecord) -> String {
    format!(
        "{}  {}  {:<10} {:>6.2}  {} ({})",
        record.id,
        record.timestamp.format("%Y-%m-%d %H:%M"),
        record.status.as_str().to_uppercase(),
        record.probability_score,
        record.filename,
        record.mode
    )
}

fn format_record(record: &ScanRecord) -> String {
    let mut out = format!("Scan {}\n", record.id);
    out.push_str(&format!(
        "  Saved:    {}\n",
        record.timestamp.format("%Y-%m-%dT%H:%M:%S%.3fZ")
    ));
    out.push_str(&format_verdict(&VerdictView {
        filename: &record.filename,
        source_url: record.source_url.as_deref(),
        mode: record.mode,
        status: record.status,
        probability_score: record.probability_score,
        summary: &record.summary,
        markers: &record.markers,
    }));
    out
}

/// Rendering of a verdict that never made it into history.
fn format_unsaved(scan: &NewScan) -> String {
    let mut out = String::from("Scan (not saved)\n");
    out.push_str(&format_verdict(&VerdictView {
        filename: &scan.filename,
        source_url: scan.source_url.as_deref(),
        mode: scan.mode,
        status: scan.status,
        probability_score: scan.probability_score,
        summary: &scan.summary,
        markers: &scan.markers,
    }));
    out
}

struct VerdictView<'a> {
    filename: &'a str,
    source_url: Option<&'a str>,
    mode: MediaMode,
    status: ScanStatus,
    probability_score: f64,
    summary: &'a str,
    markers: &'a [ForensicMarker],
}

fn format_verdict(view: &VerdictView<'_>) -> String {
    let mut out = format!("  File:     {}\n", view.filename);
    if let Some(url) = view.source_url {
        out.push_str(&format!("  Source:   {}\n", url));
    }
    out.push_str(&format!("  Mode:     {}\n", view.mode));
    out.push_str(&format!(
        "  Verdict:  {} ({:.2})\n",
        view.status.as_str().to_uppercase(),
        view.probability_score
    ));
    out.push_str(&format!("  Summary:  {}\n", view.summary));
    if !view.markers.is_empty() {
        out.push_str("  Markers:\n");
        for marker in view.markers {
            out.push_str(&format!(
                "    [{}] {:<6} {}: {}\n",
                marker.position,
                marker.severity.as_str(),
                marker.label,
                marker.description
            ));
        }
    }
    out
}

/// Redact known secret keys in a JSON value (recursive).
fn redact_secrets(mut value: Value) -> Value {
    match &mut value {
        Value::Object(map) => {
            let keys: Vec<String> = map.keys().cloned().collect();
            for key in keys {
                let lower = key.to_lowercase();
                if SECRET_KEYS.iter().any(|s| lower.contains(s)) {
                    map.insert(key, Value::String("[REDACTED]".to_string()));
                } else if let Some(child) = map.remove(&key) {
                    map.insert(key, redact_secrets(child));
                }
            }
        }
        Value::Array(arr) => {
            for item in arr.iter_mut() {
                *item = redact_secrets(item.take());
            }
        }
        _ => {}
    }
    value
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::{Severity, SourceType};
    use chrono::Utc;

    #[test]
    fn test_cli_requires_subcommand() {
        assert!(Cli::try_parse_from(["forensight"]).is_err());
    }

    #[test]
    fn test_cli_version_subcommand() {
        let cli = Cli::try_parse_from(["forensight", "version"]).unwrap();
        assert!(matches!(cli.command, Command::Version));
    }

    #[test]
    fn test_cli_analyze_defaults() {
        let cli = Cli::try_parse_from(["forensight", "analyze", "clip.mp4"]).unwrap();
        match cli.command {
            Command::Analyze {
                ref input,
                mode,
                json,
            } => {
                assert_eq!(input, "clip.mp4");
                assert_eq!(mode, None);
                assert!(!json);
            }
            other => panic!("Expected Analyze, got {:?}", other),
        }
    }

    #[test]
    fn test_cli_analyze_with_mode_and_json() {
        let cli = Cli::try_parse_from([
            "forensight",
            "analyze",
            "https://example.com/a.png",
            "--mode",
            "image",
            "--json",
        ])
        .unwrap();
        match cli.command {
            Command::Analyze { mode, json, .. } => {
                assert_eq!(mode, Some(MediaMode::Image));
                assert!(json);
            }
            other => panic!("Expected Analyze, got {:?}", other),
        }
    }

    #[test]
    fn test_cli_analyze_rejects_unknown_mode() {
        let result = Cli::try_parse_from(["forensight", "analyze", "x", "-m", "audio"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_history_list() {
        let cli = Cli::try_parse_from(["forensight", "history", "list", "--json"]).unwrap();
        assert!(matches!(
            cli.command,
            Command::History(HistoryCommand::List { json: true })
        ));
    }

    #[test]
    fn test_cli_history_show() {
        let id = Uuid::new_v4();
        let cli =
            Cli::try_parse_from(["forensight", "history", "show", &id.to_string()]).unwrap();
        match cli.command {
            Command::History(HistoryCommand::Show { id: parsed }) => assert_eq!(parsed, id),
            other => panic!("Expected History(Show), got {:?}", other),
        }
    }

    #[test]
    fn test_cli_history_show_rejects_bad_id() {
        assert!(Cli::try_parse_from(["forensight", "history", "show", "nope"]).is_err());
    }

    #[test]
    fn test_cli_config_show() {
        let cli = Cli::try_parse_from(["forensight", "config", "show"]).unwrap();
        assert!(matches!(cli.command, Command::Config(ConfigCommand::Show)));
    }

    #[test]
    fn test_cli_config_path() {
        let cli = Cli::try_parse_from(["forensight", "config", "path"]).unwrap();
        assert!(matches!(cli.command, Command::Config(ConfigCommand::Path)));
    }

    #[test]
    fn test_is_remote() {
        assert!(is_remote("https://example.com/a.mp4"));
        assert!(is_remote("HTTP://example.com/a.mp4"));
        assert!(!is_remote("/tmp/a.mp4"));
        assert!(!is_remote("ftp://example.com/a.mp4"));
    }

    #[test]
    fn test_infer_mode_from_upload() {
        let video = MediaInput::upload(vec![1], "video/mp4", None);
        let image = MediaInput::upload(vec![1], "image/jpeg", None);
        let other = MediaInput::upload(vec![1], "application/pdf", None);
        assert_eq!(infer_mode(&video), Some(MediaMode::Video));
        assert_eq!(infer_mode(&image), Some(MediaMode::Image));
        assert_eq!(infer_mode(&other), None);
    }

    #[test]
    fn test_infer_mode_from_url_extension() {
        let input = MediaInput::url("https://cdn.example.com/media/clip.webm?sig=abc");
        assert_eq!(infer_mode(&input), Some(MediaMode::Video));

        let input = MediaInput::url("https://cdn.example.com/photo.PNG");
        assert_eq!(infer_mode(&input), Some(MediaMode::Image));

        let input = MediaInput::url("https://example.com/watch");
        assert_eq!(infer_mode(&input), None);
    }

    #[test]
    fn test_summary_line() {
        let record = ScanRecord {
            id: Uuid::nil(),
            filename: "clip.mp4".to_string(),
            timestamp: Utc::now(),
            mode: MediaMode::Video,
            source_type: SourceType::Upload,
            source_url: None,
            probability_score: 82.5,
            status: ScanStatus::Fake,
            summary: "lip sync drift".to_string(),
            markers: Vec::new(),
            raw: Value::Null,
        };
        let line = summary_line(&record);
        assert!(line.contains("FAKE"));
        assert!(line.contains("82.50"));
        assert!(line.ends_with("clip.mp4 (video)"));
    }

    fn fake_scan() -> NewScan {
        NewScan {
            filename: "interview.mov".to_string(),
            mode: MediaMode::Video,
            source_type: SourceType::Upload,
            source_url: None,
            probability_score: 88.0,
            status: ScanStatus::Fake,
            summary: "lip sync drift".to_string(),
            markers: vec![ForensicMarker {
                position: "00:03".to_string(),
                label: "[Stage 3] Lip-sync drift".to_string(),
                severity: Severity::High,
                description: "audio leads by 200ms".to_string(),
            }],
            raw: serde_json::json!({"confidenceScore": 88.0}),
        }
    }

    #[tokio::test]
    async fn test_save_scan_renders_saved_record() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(
            Arc::new(JsonFileBackend::new(temp_dir.path().join("history.json"))),
            10,
        );

        let output = save_scan(&store, fake_scan(), false).await;

        assert!(output.error.is_none());
        let saved = store.list().await.unwrap();
        assert_eq!(saved.len(), 1);
        assert!(output.rendered.starts_with(&format!("Scan {}", saved[0].id)));
        assert!(output.rendered.contains("FAKE (88.00)"));
    }

    #[tokio::test]
    async fn test_save_scan_corrupt_history_keeps_verdict() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("history.json");
        std::fs::write(&path, "not json").unwrap();
        let store = HistoryStore::new(Arc::new(JsonFileBackend::new(&path)), 10);

        let output = save_scan(&store, fake_scan(), false).await;

        let error = output.error.expect("save should fail on a corrupt file");
        assert!(error.contains("not saved to history"));
        assert!(error.contains("corrupt"));
        assert!(output.rendered.starts_with("Scan (not saved)"));
        assert!(output.rendered.contains("FAKE (88.00)"));
        assert!(output.rendered.contains("[00:03] high"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "not json");
    }

    #[tokio::test]
    async fn test_save_scan_failure_renders_json() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("history.json");
        std::fs::write(&path, "[{").unwrap();
        let store = HistoryStore::new(Arc::new(JsonFileBackend::new(&path)), 10);

        let output = save_scan(&store, fake_scan(), true).await;

        assert!(output.error.is_some());
        let value: Value = serde_json::from_str(&output.rendered).unwrap();
        assert_eq!(value["status"], "fake");
        assert_eq!(value["probabilityScore"], 88.0);
    }

    #[test]
    fn test_redact_secrets() {
        let val = serde_json::json!({
            "engine": {
                "apiKey": "AIza-secret",
                "model": "gemini"
            },
            "history": { "capacity": 10 }
        });
        let redacted = redact_secrets(val);
        assert_eq!(redacted["engine"]["apiKey"], "[REDACTED]");
        assert_eq!(redacted["engine"]["model"], "gemini");
        assert_eq!(redacted["history"]["capacity"], 10);
    }

    #[test]
    fn test_redact_secrets_array() {
        let val = serde_json::json!([{"apiKey": "secret"}, {"safe": "ok"}]);
        let redacted = redact_secrets(val);
        assert_eq!(redacted[0]["apiKey"], "[REDACTED]");
        assert_eq!(redacted[1]["safe"], "ok");
    }
}
