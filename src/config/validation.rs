use super::defaults::{
    MAX_COMMAND_ARGS, MAX_COMMAND_BYTES, MAX_MIN_REMAINING_SECONDS, MAX_SAMPLE_COUNT,
    MAX_SAMPLE_SECONDS, MIN_SAMPLE_SECONDS,
};
use super::{AppConfig, ControllerConfig};
use anyhow::{anyhow, bail, Context, Result};
use std::{fs, path::Path};

impl AppConfig {
    /// Check CLI values and normalize command lines.
    pub fn validate(&mut self) -> Result<()> {
        if !(MIN_SAMPLE_SECONDS..=MAX_SAMPLE_SECONDS).contains(&self.seconds) {
            bail!(
                "--seconds must be between {MIN_SAMPLE_SECONDS} and {MAX_SAMPLE_SECONDS}, got {}",
                self.seconds
            );
        }
        if !(1..=MAX_SAMPLE_COUNT).contains(&self.count) {
            bail!(
                "--count must be between 1 and {MAX_SAMPLE_COUNT}, got {}",
                self.count
            );
        }
        if !self.min_remaining_seconds.is_finite()
            || !(0.0..=MAX_MIN_REMAINING_SECONDS).contains(&self.min_remaining_seconds)
        {
            bail!(
                "--min-remaining-seconds must be between 0 and {MAX_MIN_REMAINING_SECONDS}, got {}",
                self.min_remaining_seconds
            );
        }

        self.recognizer_cmd = normalize_command(&self.recognizer_cmd, "--recognizer-cmd")?;
        if let Some(action) = self.action_cmd.take() {
            // An empty env var means "not configured", not an error.
            if !action.trim().is_empty() {
                self.action_cmd = Some(normalize_command(&action, "--action-cmd")?);
            }
        }

        Ok(())
    }

    /// File logging is on when asked for and not vetoed by `--no-logs`.
    pub fn logging_enabled(&self) -> bool {
        (self.logs || self.log_timings) && !self.no_logs
    }

    /// Snapshot the gating thresholds for the controller.
    pub fn controller_config(&self) -> ControllerConfig {
        ControllerConfig {
            confidence_min: self.confidence_min,
            min_remaining_seconds: self.min_remaining_seconds,
        }
    }

    /// Recognizer argv, program first.
    pub fn recognizer_argv(&self) -> Result<Vec<String>> {
        split_command(&self.recognizer_cmd, "--recognizer-cmd")
    }

    /// Action argv when an action command is configured.
    pub fn action_argv(&self) -> Result<Option<Vec<String>>> {
        self.action_cmd
            .as_deref()
            .map(|cmd| split_command(cmd, "--action-cmd"))
            .transpose()
    }
}

pub(super) fn split_command(value: &str, flag: &str) -> Result<Vec<String>> {
    let argv = shell_words::split(value)
        .with_context(|| format!("{flag} is not a valid command line: '{value}'"))?;
    if argv.is_empty() {
        bail!("{flag} cannot be empty");
    }
    Ok(argv)
}

/// Check a command line and canonicalize its program when it is given as a path.
pub(super) fn normalize_command(value: &str, flag: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.len() > MAX_COMMAND_BYTES {
        bail!("{flag} exceeds {MAX_COMMAND_BYTES} bytes");
    }
    if trimmed.chars().any(|ch| matches!(ch, '\n' | '\r' | '\0')) {
        bail!("{flag} must be a single line");
    }
    let mut argv = split_command(trimmed, flag)?;
    if argv.len() > MAX_COMMAND_ARGS {
        bail!(
            "{flag} has too many arguments (max {MAX_COMMAND_ARGS}, got {})",
            argv.len()
        );
    }
    argv[0] = sanitize_program(&argv[0], flag)?;
    Ok(shell_words::join(&argv))
}

/// Allow a bare program name (resolved from PATH) or an existing executable path.
pub(super) fn sanitize_program(program: &str, flag: &str) -> Result<String> {
    if program.is_empty() {
        bail!("{flag} program cannot be empty");
    }
    let path = Path::new(program);
    if !(path.is_absolute() || program.contains(std::path::MAIN_SEPARATOR)) {
        return Ok(program.to_string());
    }

    let canonical = path
        .canonicalize()
        .with_context(|| format!("failed to canonicalize {flag} program '{program}'"))?;
    let metadata = fs::metadata(&canonical)
        .with_context(|| format!("failed to inspect {flag} program '{}'", canonical.display()))?;
    if !metadata.is_file() {
        bail!("{flag} program '{}' is not a file", canonical.display());
    }
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mode = metadata.permissions().mode();
        if mode & 0o111 == 0 {
            bail!(
                "{flag} program '{}' exists but is not executable (mode {:o})",
                canonical.display(),
                mode
            );
        }
    }
    canonical
        .to_str()
        .map(|s| s.to_string())
        .ok_or_else(|| anyhow!("{flag} program path must be valid UTF-8"))
}
