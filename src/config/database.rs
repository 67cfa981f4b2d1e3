//! DATABASE_URL lookup for the recognizer's fingerprint store.
//!
//! The recognizer owns the database; we only work out which URL to hand it.
//! A value in the settings file wins over the inherited environment, and a
//! missing or broken file just means "no override".

use crate::log_debug;
use serde::Deserialize;
use std::{env, fs, path::Path};

/// In-memory store used when nothing else is configured.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://";

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    #[serde(rename = "DATABASE_URL", default)]
    database_url: Option<String>,
}

/// Read `DATABASE_URL` from a JSON settings file, if the file and key exist.
pub fn read_database_url(path: &Path) -> Option<String> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) => {
            log_debug(&format!("Could not read file: {} ({err})", path.display()));
            return None;
        }
    };
    match serde_json::from_str::<SettingsFile>(&raw) {
        Ok(settings) => settings
            .database_url
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty()),
        Err(err) => {
            log_debug(&format!(
                "Ignoring malformed settings file {}: {err}",
                path.display()
            ));
            None
        }
    }
}

/// File value, then the `DATABASE_URL` environment variable, then the default.
pub fn resolve_database_url(settings_file: &Path) -> String {
    pick_database_url(
        read_database_url(settings_file),
        env::var("DATABASE_URL").ok(),
    )
}

pub(super) fn pick_database_url(from_file: Option<String>, from_env: Option<String>) -> String {
    from_file
        .or_else(|| from_env.filter(|url| !url.trim().is_empty()))
        .unwrap_or_else(|| DEFAULT_DATABASE_URL.to_string())
}
