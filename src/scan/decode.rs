//! Defensive decoding of engine responses.
//!
//! The engine is asked for a fixed schema but nothing guarantees it complies,
//! so every field is extracted individually with a documented default:
//!
//! | field              | missing / wrong type        |
//! |--------------------|-----------------------------|
//! | `confidenceScore`  | `0.00`                      |
//! | `executiveSummary` | [`DEFAULT_SUMMARY`]         |
//! | `forensicMarkers`  | empty list                  |
//! | marker `severity`  | `low`                       |
//! | marker strings     | empty string                |
//!
//! Only an empty body, unparsable JSON, or a non-object top level fail.

use serde_json::{Map, Value};

use super::{classify, AnalysisResult, ForensicMarker, Severity};
use crate::media::analysis::AnalysisError;

/// Substituted when the engine omits the summary.
pub const DEFAULT_SUMMARY: &str = "No summary available.";

const SCORE_FIELD: &str = "confidenceScore";
const SUMMARY_FIELD: &str = "executiveSummary";
const MARKERS_FIELD: &str = "forensicMarkers";

/// Decode raw engine text into a fully populated [`AnalysisResult`].
pub fn decode_response(text: &str) -> Result<AnalysisResult, AnalysisError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(AnalysisError::Decode("engine returned an empty response".to_string()));
    }

    let raw: Value = serde_json::from_str(trimmed)
        .map_err(|e| AnalysisError::Decode(format!("response is not valid JSON: {e}")))?;

    let object = raw.as_object().ok_or_else(|| {
        AnalysisError::Decode("response top level is not a JSON object".to_string())
    })?;

    let probability_score = extract_score(object);
    let summary = extract_summary(object);
    let markers = extract_markers(object);

    Ok(AnalysisResult {
        probability_score,
        status: classify(probability_score),
        summary,
        markers,
        raw,
    })
}

/// Round a score to two decimals after clamping into `[0, 100]`.
pub fn normalize_score(score: f64) -> f64 {
    if !score.is_finite() {
        return 0.0;
    }
    let clamped = score.clamp(0.0, 100.0);
    (clamped * 100.0).round() / 100.0
}

fn extract_score(object: &Map<String, Value>) -> f64 {
    object
        .get(SCORE_FIELD)
        .and_then(Value::as_f64)
        .map(normalize_score)
        .unwrap_or(0.0)
}

fn extract_summary(object: &Map<String, Value>) -> String {
    object
        .get(SUMMARY_FIELD)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| DEFAULT_SUMMARY.to_string())
}

fn extract_markers(object: &Map<String, Value>) -> Vec<ForensicMarker> {
    let Some(entries) = object.get(MARKERS_FIELD).and_then(Value::as_array) else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(Value::as_object)
        .map(decode_marker)
        .collect()
}

fn decode_marker(entry: &Map<String, Value>) -> ForensicMarker {
    let text = |key: &str| {
        entry
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    // the engine schema calls the position "timestamp"
    let position = entry
        .get("timestamp")
        .or_else(|| entry.get("position"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let severity = entry
        .get("severity")
        .and_then(Value::as_str)
        .map(Severity::parse_lenient)
        .unwrap_or_default();

    ForensicMarker {
        position,
        label: text("label"),
        severity,
        description: text("description"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scan::ScanStatus;

    #[test]
    fn test_decode_clean_scenario() {
        let result = decode_response(
            r#"{"confidenceScore": 12.34, "executiveSummary": "ok", "forensicMarkers": []}"#,
        )
        .unwrap();
        assert_eq!(result.probability_score, 12.34);
        assert_eq!(result.status, ScanStatus::Clean);
        assert_eq!(result.summary, "ok");
        assert!(result.markers.is_empty());
    }

    #[test]
    fn test_decode_fake_scenario() {
        let result = decode_response(
            r#"{
                "confidenceScore": 88.00,
                "executiveSummary": "bad",
                "forensicMarkers": [{
                    "timestamp": "00:07",
                    "label": "[Stage 1] Boundary blending",
                    "severity": "high",
                    "description": "warping at the hairline"
                }]
            }"#,
        )
        .unwrap();
        assert_eq!(result.status, ScanStatus::Fake);
        assert_eq!(result.probability_score, 88.0);
        assert_eq!(result.markers.len(), 1);
        assert_eq!(result.markers[0].position, "00:07");
        assert_eq!(result.markers[0].severity, Severity::High);
    }

    #[test]
    fn test_decode_missing_markers_is_empty() {
        let result =
            decode_response(r#"{"confidenceScore": 50, "executiveSummary": "hmm"}"#).unwrap();
        assert!(result.markers.is_empty());
        assert_eq!(result.status, ScanStatus::Suspicious);
    }

    #[test]
    fn test_decode_missing_summary_uses_placeholder() {
        let result = decode_response(r#"{"confidenceScore": 10}"#).unwrap();
        assert_eq!(result.summary, DEFAULT_SUMMARY);
        assert!(!result.summary.is_empty());

        let blank = decode_response(r#"{"executiveSummary": "   "}"#).unwrap();
        assert_eq!(blank.summary, DEFAULT_SUMMARY);
    }

    #[test]
    fn test_decode_missing_score_defaults_to_zero() {
        let result = decode_response(r#"{"executiveSummary": "no score"}"#).unwrap();
        assert_eq!(result.probability_score, 0.0);
        assert_eq!(result.status, ScanStatus::Clean);
    }

    #[test]
    fn test_decode_non_numeric_score_defaults_to_zero() {
        let result = decode_response(r#"{"confidenceScore": "ninety"}"#).unwrap();
        assert_eq!(result.probability_score, 0.0);
    }

    #[test]
    fn test_decode_rounds_to_two_decimals() {
        let result = decode_response(r#"{"confidenceScore": 40.006}"#).unwrap();
        assert_eq!(result.probability_score, 40.01);
        assert_eq!(result.status, ScanStatus::Suspicious);
    }

    #[test]
    fn test_decode_clamps_out_of_range_scores() {
        assert_eq!(
            decode_response(r#"{"confidenceScore": 140}"#).unwrap().probability_score,
            100.0
        );
        assert_eq!(
            decode_response(r#"{"confidenceScore": -3}"#).unwrap().probability_score,
            0.0
        );
    }

    #[test]
    fn test_decode_unknown_severity_defaults_to_low() {
        let result = decode_response(
            r#"{"forensicMarkers": [
                {"timestamp": "01:02", "label": "a",
                 "severity": "catastrophic", "description": "x"},
                {"position": "left eye", "label": "b", "description": "y"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(result.markers.len(), 2);
        assert_eq!(result.markers[0].severity, Severity::Low);
        assert_eq!(result.markers[1].severity, Severity::Low);
        assert_eq!(result.markers[1].position, "left eye");
    }

    #[test]
    fn test_decode_skips_non_object_markers() {
        let result = decode_response(
            r#"{"forensicMarkers": ["stray", 4, {"label": "kept", "severity": "medium"}]}"#,
        )
        .unwrap();
        assert_eq!(result.markers.len(), 1);
        assert_eq!(result.markers[0].label, "kept");
        assert_eq!(result.markers[0].position, "");
        assert_eq!(result.markers[0].description, "");
    }

    #[test]
    fn test_decode_keeps_raw_payload() {
        let result =
            decode_response(r#"{"confidenceScore": 5, "extra": {"nested": true}}"#).unwrap();
        assert_eq!(result.raw["extra"]["nested"], true);
    }

    #[test]
    fn test_decode_empty_text_fails() {
        let err = decode_response("   ").unwrap_err();
        assert!(matches!(err, AnalysisError::Decode(_)));
        assert!(err.to_string().starts_with("decode failure"));
    }

    #[test]
    fn test_decode_invalid_json_fails() {
        let err = decode_response("{not json").unwrap_err();
        assert!(matches!(err, AnalysisError::Decode(_)));
    }

    #[test]
    fn test_decode_non_object_fails() {
        assert!(decode_response("[1, 2, 3]").is_err());
        assert!(decode_response("null").is_err());
    }

    #[test]
    fn test_normalize_score() {
        assert_eq!(normalize_score(75.004), 75.0);
        assert_eq!(normalize_score(12.345678), 12.35);
        assert_eq!(normalize_score(f64::NAN), 0.0);
    }
}
