//! Untyped configuration bag shared by Core, Container and Playback
//!
//! Options are a string-keyed JSON map. Unknown keys are carried along and
//! ignored; missing optional keys fall back to documented defaults. Numeric
//! options accept integers, floats and numeric strings, always widened to
//! `f64`.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Source URL to load
pub const SOURCE_URL: &str = "sourceUrl";
/// MIME type hint, overrides the type derived from the URL extension
pub const MIME_TYPE: &str = "mimeType";
/// Minimum seekable window (seconds) for a live stream to count as DVR
pub const MIN_DVR_SIZE: &str = "minDvrSize";
/// Initial position in seconds
pub const START_AT: &str = "startAt";
/// Live start time in seconds
pub const LIVE_START_TIME: &str = "liveStartTime";
/// Restart from the beginning when the item completes
pub const LOOP: &str = "loop";
/// Message exposed by the no-op playback
pub const PLAYBACK_NOT_SUPPORTED_MESSAGE: &str = "playbackNotSupportedMessage";

/// Configuration bag passed at construction
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Options(Map<String, Value>);

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse options from a JSON object
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::InvalidConfig(e.to_string()))
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Overlay `other` on top of these options; later values win
    pub fn merged(&self, other: &Options) -> Options {
        let mut merged = self.0.clone();
        for (key, value) in &other.0 {
            merged.insert(key.clone(), value.clone());
        }
        Options(merged)
    }

    /// String value, `None` when absent or not a string
    pub fn string(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Numeric value normalized to `f64`
    pub fn f64(&self, key: &str) -> Option<f64> {
        match self.0.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    /// Boolean value, accepting JSON booleans and "true"/"false" strings
    pub fn bool_or(&self, key: &str, or_else: bool) -> bool {
        match self.0.get(key) {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => match s.as_str() {
                "true" => true,
                "false" => false,
                _ => or_else,
            },
            _ => or_else,
        }
    }

    pub fn source_url(&self) -> Option<&str> {
        self.string(SOURCE_URL)
    }

    pub fn mime_type(&self) -> Option<&str> {
        self.string(MIME_TYPE)
    }

    pub fn start_at(&self) -> Option<f64> {
        self.f64(START_AT)
    }

    pub fn live_start_time(&self) -> Option<f64> {
        self.f64(LIVE_START_TIME)
    }

    pub fn min_dvr_size(&self) -> Option<f64> {
        self.f64(MIN_DVR_SIZE)
    }

    pub fn is_loop(&self) -> bool {
        self.bool_or(LOOP, false)
    }
}

impl From<Map<String, Value>> for Options {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_numeric_normalization() {
        let options = Options::new()
            .with(START_AT, 10)
            .with(LIVE_START_TIME, 12.5)
            .with(MIN_DVR_SIZE, "90");

        assert_eq!(options.start_at(), Some(10.0));
        assert_eq!(options.live_start_time(), Some(12.5));
        assert_eq!(options.min_dvr_size(), Some(90.0));
    }

    #[test]
    fn test_invalid_numeric_string_is_absent() {
        let options = Options::new().with(START_AT, "soon").with(MIN_DVR_SIZE, true);
        assert_eq!(options.start_at(), None);
        assert_eq!(options.min_dvr_size(), None);
        assert_eq!(options.live_start_time(), None);
    }

    #[test]
    fn test_bool_parsing() {
        let options = Options::new().with(LOOP, "true").with("chromeless", false);
        assert!(options.is_loop());
        assert!(!options.bool_or("chromeless", true));
        assert!(options.bool_or("missing", true));
    }

    #[test]
    fn test_from_json_ignores_unknown_keys() {
        let options =
            Options::from_json(r#"{"sourceUrl": "https://x/video.mp4", "whatever": [1, 2]}"#).unwrap();
        assert_eq!(options.source_url(), Some("https://x/video.mp4"));
        assert_eq!(options.mime_type(), None);
        assert_eq!(options.get("whatever"), Some(&json!([1, 2])));
    }

    #[test]
    fn test_from_json_rejects_non_object() {
        let err = Options::from_json("[1, 2, 3]").unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CONFIG");
    }

    #[test]
    fn test_merged_later_wins() {
        let base = Options::new().with(SOURCE_URL, "a.mp4").with(LOOP, true);
        let overlay = Options::new().with(SOURCE_URL, "b.m3u8");
        let merged = base.merged(&overlay);
        assert_eq!(merged.source_url(), Some("b.m3u8"));
        assert!(merged.is_loop());
    }
}
