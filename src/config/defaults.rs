/// Recognizer window; each call blocks roughly this long.
pub const DEFAULT_SAMPLE_SECONDS: u64 = 5;
pub const DEFAULT_SAMPLE_COUNT: u32 = 40;

/// Background noise tends to match at ~10; real clips score well above 40.
pub const DEFAULT_CONFIDENCE_MIN: u32 = 40;

/// The volume action needs several remote key presses to be worth it.
pub const DEFAULT_MIN_REMAINING_SECONDS: f64 = 8.0;

pub const DEFAULT_DURATIONS_FILE: &str = "data/media_durations_second.json";
pub const DEFAULT_CONFIG_FILE: &str = "data/config.json";
pub const DEFAULT_RECOGNIZER_CMD: &str = "dejavu-recognize";

pub(super) const MIN_SAMPLE_SECONDS: u64 = 1;
pub(super) const MAX_SAMPLE_SECONDS: u64 = 60;
pub(super) const MAX_SAMPLE_COUNT: u32 = 100_000;
pub(super) const MAX_MIN_REMAINING_SECONDS: f64 = 3_600.0;
pub(super) const MAX_COMMAND_ARGS: usize = 32;
pub(super) const MAX_COMMAND_BYTES: usize = 4096;
