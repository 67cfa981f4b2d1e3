//! Known clip durations, loaded once at startup.

use crate::log_debug;
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Read-only `content_id -> duration_seconds` table.
#[derive(Debug, Clone, Default)]
pub struct DurationRegistry {
    durations: HashMap<String, f64>,
}

impl DurationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the table, falling back to an empty registry when the file is
    /// missing or unreadable so sampling can still run (it will just never act).
    pub fn load(path: &Path) -> Self {
        match Self::try_load(path) {
            Ok(registry) => {
                log_debug(&format!(
                    "duration registry: {} entries from {}",
                    registry.len(),
                    path.display()
                ));
                registry
            }
            Err(err) => {
                log_debug(&format!(
                    "duration registry unavailable, continuing empty: {err:#}"
                ));
                tracing::warn!(
                    path = %path.display(),
                    error = %format!("{err:#}"),
                    "duration registry unavailable"
                );
                Self::new()
            }
        }
    }

    pub fn try_load(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read durations file '{}'", path.display()))?;
        let parsed: HashMap<String, f64> = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse durations file '{}'", path.display()))?;
        Ok(parsed.into_iter().collect())
    }

    pub fn lookup(&self, content_id: &str) -> Option<f64> {
        self.durations.get(content_id).copied()
    }

    pub fn len(&self) -> usize {
        self.durations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.durations.is_empty()
    }
}

impl FromIterator<(String, f64)> for DurationRegistry {
    /// Negative or non-finite durations are dropped.
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        let mut durations = HashMap::new();
        for (content_id, seconds) in iter {
            if seconds.is_finite() && seconds >= 0.0 {
                durations.insert(content_id, seconds);
            } else {
                log_debug(&format!(
                    "skipping duration for '{content_id}': {seconds} is not a usable length"
                ));
            }
        }
        Self { durations }
    }
}
