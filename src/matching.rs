//! Match events and the pure arithmetic the controller gates on.

use serde::Deserialize;

/// One recognizer answer for one sampling window.
///
/// `offset_seconds` is where in the clip the start of the window lined up.
/// It is noisy: slightly negative values and values past the clip end both
/// show up in practice.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MatchEvent {
    #[serde(rename = "song_name", default)]
    pub content_id: Option<String>,
    #[serde(default)]
    pub confidence: u32,
    #[serde(default)]
    pub offset_seconds: f64,
}

impl MatchEvent {
    pub fn new(content_id: impl Into<String>, confidence: u32, offset_seconds: f64) -> Self {
        Self {
            content_id: Some(content_id.into()),
            confidence,
            offset_seconds,
        }
    }

    /// An answer that named nothing.
    pub fn unmatched() -> Self {
        Self {
            content_id: None,
            confidence: 0,
            offset_seconds: 0.0,
        }
    }
}

/// Threshold filter that keeps background-noise matches away from the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfidenceGate {
    threshold: u32,
}

impl ConfidenceGate {
    pub fn new(threshold: u32) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn accept(&self, event: &MatchEvent) -> bool {
        event.content_id.is_some() && event.confidence >= self.threshold
    }
}

impl Default for ConfidenceGate {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_CONFIDENCE_MIN)
    }
}

/// Estimated seconds left in the clip once the sampling window has been consumed.
///
/// The result can be negative when the clip already ended (or the offset is
/// noisy); callers decide what is too short to act on.
pub fn remaining_seconds(
    duration_seconds: f64,
    offset_seconds: f64,
    sample_window_seconds: f64,
) -> f64 {
    duration_seconds - (offset_seconds + sample_window_seconds)
}
