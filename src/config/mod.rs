//! Command-line parsing and validation helpers.

mod database;
mod defaults;
mod validation;

use clap::Parser;
use std::path::PathBuf;

pub use database::{read_database_url, resolve_database_url, DEFAULT_DATABASE_URL};
pub use defaults::{
    DEFAULT_CONFIDENCE_MIN, DEFAULT_CONFIG_FILE, DEFAULT_DURATIONS_FILE,
    DEFAULT_MIN_REMAINING_SECONDS, DEFAULT_RECOGNIZER_CMD, DEFAULT_SAMPLE_COUNT,
    DEFAULT_SAMPLE_SECONDS,
};

/// CLI options for quietbreak. Validated values keep the helper subprocesses sane.
#[derive(Debug, Parser, Clone)]
#[command(
    about = "quietbreak: turn the TV down for recognized commercial breaks",
    author,
    version
)]
pub struct AppConfig {
    /// Sampling window handed to the recognizer (seconds)
    #[arg(long, default_value_t = DEFAULT_SAMPLE_SECONDS)]
    pub seconds: u64,

    /// Number of sampling iterations before exiting
    #[arg(long, default_value_t = DEFAULT_SAMPLE_COUNT)]
    pub count: u32,

    /// Minimum recognizer confidence treated as a real match
    #[arg(long = "confidence-min", default_value_t = DEFAULT_CONFIDENCE_MIN)]
    pub confidence_min: u32,

    /// Shortest remaining clip time worth acting on (seconds)
    #[arg(
        long = "min-remaining-seconds",
        default_value_t = DEFAULT_MIN_REMAINING_SECONDS
    )]
    pub min_remaining_seconds: f64,

    /// JSON object mapping content ids to durations in seconds
    #[arg(long, default_value = DEFAULT_DURATIONS_FILE)]
    pub durations: PathBuf,

    /// JSON settings file that may carry DATABASE_URL for the recognizer
    #[arg(long = "config-file", default_value = DEFAULT_CONFIG_FILE)]
    pub config_file: PathBuf,

    /// Recognizer command line; `--seconds <N>` is appended
    #[arg(
        long = "recognizer-cmd",
        env = "QUIETBREAK_RECOGNIZER_CMD",
        default_value = DEFAULT_RECOGNIZER_CMD
    )]
    pub recognizer_cmd: String,

    /// Volume action command line; `--duration-seconds <S>` is appended (dry run when unset)
    #[arg(long = "action-cmd", env = "QUIETBREAK_ACTION_CMD")]
    pub action_cmd: Option<String>,

    /// Enable file logging (debug)
    #[arg(long = "logs", env = "QUIETBREAK_LOGS", default_value_t = false)]
    pub logs: bool,

    /// Disable all file logging (overrides --logs and log env vars)
    #[arg(long = "no-logs", env = "QUIETBREAK_NO_LOGS", default_value_t = false)]
    pub no_logs: bool,

    /// Enable verbose timing logs
    #[arg(long)]
    pub log_timings: bool,

    /// Print the resolved configuration and exit
    #[arg(long = "doctor", default_value_t = false)]
    pub doctor: bool,
}

/// Tunables for the match controller, lifted out of the CLI flags.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerConfig {
    pub confidence_min: u32,
    pub min_remaining_seconds: f64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            confidence_min: DEFAULT_CONFIDENCE_MIN,
            min_remaining_seconds: DEFAULT_MIN_REMAINING_SECONDS,
        }
    }
}
