//! Audio-matching oracle.
//!
//! Fingerprinting lives in an external recognizer; it listens for the window,
//! matches against its database, and prints one JSON answer on stdout.

use crate::log_debug;
use crate::matching::MatchEvent;
use anyhow::{anyhow, bail, Context, Result};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant};

/// Identifies what is playing during the next `sample_window`.
///
/// Expected to block for roughly the window length.
pub trait MatchOracle {
    fn recognize(&mut self, sample_window: Duration) -> Result<Option<MatchEvent>>;
}

/// Runs `<argv...> --seconds <W>` and parses the recognizer's JSON answer.
pub struct CommandOracle {
    argv: Vec<String>,
    database_url: String,
    log_timings: bool,
}

impl CommandOracle {
    pub fn new(argv: Vec<String>, database_url: impl Into<String>) -> Result<Self> {
        if argv.first().map_or(true, |program| program.trim().is_empty()) {
            bail!("recognizer command cannot be empty");
        }
        Ok(Self {
            argv,
            database_url: database_url.into(),
            log_timings: false,
        })
    }

    pub fn with_timings(mut self, log_timings: bool) -> Self {
        self.log_timings = log_timings;
        self
    }

    fn command(&self, sample_window: Duration) -> Command {
        let mut cmd = Command::new(&self.argv[0]);
        cmd.args(&self.argv[1..]);
        cmd.args(["--seconds".to_string(), sample_window.as_secs().to_string()]);
        cmd.env("DATABASE_URL", &self.database_url);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());
        cmd
    }
}

impl MatchOracle for CommandOracle {
    fn recognize(&mut self, sample_window: Duration) -> Result<Option<MatchEvent>> {
        let started = Instant::now();
        let output = self
            .command(sample_window)
            .output()
            .context("failed to run recognizer command")?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!(
                "recognizer failed with status {}.\nstdout:\n{}\nstderr:\n{}",
                output.status,
                stdout.trim(),
                stderr.trim()
            ));
        }
        let event = parse_recognizer_output(&stdout)?;
        if self.log_timings {
            log_debug(&format!(
                "timing|phase=recognize|window_s={}|elapsed_s={:.3}|matched={}",
                sample_window.as_secs(),
                started.elapsed().as_secs_f64(),
                event.is_some()
            ));
        }
        Ok(event)
    }
}

/// Pull the recognizer answer out of stdout.
///
/// Empty output and `null` mean "nothing recognized". Recognizers are chatty,
/// so when the whole output is not JSON the last JSON-looking line wins (an
/// optional `JSON:` prefix is allowed).
pub fn parse_recognizer_output(stdout: &str) -> Result<Option<MatchEvent>> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    if let Ok(parsed) = serde_json::from_str::<Option<MatchEvent>>(trimmed) {
        return Ok(normalize(parsed));
    }

    let mut last_parse_error: Option<(String, serde_json::Error)> = None;
    for line in stdout.lines().rev() {
        let mut candidate = line.trim();
        if let Some(rest) = candidate.strip_prefix("JSON:") {
            candidate = rest.trim();
        }
        let looks_like_json =
            candidate == "null" || (candidate.starts_with('{') && candidate.ends_with('}'));
        if !looks_like_json {
            continue;
        }
        match serde_json::from_str::<Option<MatchEvent>>(candidate) {
            Ok(parsed) => {
                if let Some((line, err)) = last_parse_error {
                    log_debug(&format!(
                        "recognizer JSON parse warnings (last error: {err} on `{line}`)"
                    ));
                }
                return Ok(normalize(parsed));
            }
            Err(err) => last_parse_error = Some((candidate.to_string(), err)),
        }
    }

    let mut error = anyhow!("recognizer did not emit JSON.\nstdout:\n{trimmed}");
    if let Some((line, parse_err)) = last_parse_error {
        error = error.context(format!("last JSON parse failure `{line}`: {parse_err}"));
    }
    Err(error)
}

fn normalize(parsed: Option<MatchEvent>) -> Option<MatchEvent> {
    parsed.filter(|event| event.content_id.is_some() || event.confidence > 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_and_null_mean_no_match() {
        assert_eq!(parse_recognizer_output("").unwrap(), None);
        assert_eq!(parse_recognizer_output("  \n").unwrap(), None);
        assert_eq!(parse_recognizer_output("null\n").unwrap(), None);
    }

    #[test]
    fn parses_single_object() {
        let out = r#"{"song_id": 12, "song_name": "chantix", "confidence": 43335, "offset": 0, "offset_seconds": 0.0, "match_time": 11.09}"#;
        let event = parse_recognizer_output(out).unwrap().unwrap();
        assert_eq!(event, MatchEvent::new("chantix", 43335, 0.0));
    }

    #[test]
    fn picks_last_json_line_from_noisy_output() {
        let out = "loading fingerprints...\n\
                   {\"song_name\": \"old\", \"confidence\": 5, \"offset_seconds\": 1.0}\n\
                   * recording\n\
                   JSON: {\"song_name\": \"chantix\", \"confidence\": 88, \"offset_seconds\": 12.5}\n\
                   done\n";
        let event = parse_recognizer_output(out).unwrap().unwrap();
        assert_eq!(event.content_id.as_deref(), Some("chantix"));
        assert_eq!(event.confidence, 88);
    }

    #[test]
    fn noisy_null_means_no_match() {
        let out = "* recording\n* done recording\nnull\n";
        assert_eq!(parse_recognizer_output(out).unwrap(), None);
    }

    #[test]
    fn garbage_is_an_error() {
        let err = parse_recognizer_output("Traceback (most recent call last):\n  boom").unwrap_err();
        assert!(format!("{err:#}").contains("did not emit JSON"));
    }

    #[test]
    fn broken_json_line_reports_parse_failure() {
        let err = parse_recognizer_output("{\"song_name\": }").unwrap_err();
        assert!(format!("{err:#}").contains("last JSON parse failure"));
    }

    #[test]
    fn command_appends_window_and_database_url() {
        let oracle = CommandOracle::new(
            vec!["dejavu-recognize".to_string(), "--mic".to_string()],
            "sqlite://",
        )
        .unwrap();
        let cmd = oracle.command(Duration::from_secs(5));
        let args: Vec<String> = cmd
            .get_args()
            .map(|arg| arg.to_string_lossy().to_string())
            .collect();
        assert_eq!(args, vec!["--mic", "--seconds", "5"]);
        let db = cmd
            .get_envs()
            .find(|(key, _)| key.to_str() == Some("DATABASE_URL"))
            .and_then(|(_, value)| value)
            .map(|value| value.to_string_lossy().to_string());
        assert_eq!(db.as_deref(), Some("sqlite://"));
    }

    #[cfg(unix)]
    #[test]
    fn recognize_runs_command_and_parses_stdout() {
        let script = r#"echo '* recording'; echo '{"song_name": "chantix", "confidence": 50, "offset_seconds": 3.0}'"#;
        let mut oracle = CommandOracle::new(
            vec!["sh".to_string(), "-c".to_string(), script.to_string(), "sh".to_string()],
            "sqlite://",
        )
        .unwrap();
        let event = oracle.recognize(Duration::from_secs(1)).unwrap().unwrap();
        assert_eq!(event, MatchEvent::new("chantix", 50, 3.0));
    }

    #[cfg(unix)]
    #[test]
    fn recognize_surfaces_failed_status() {
        let mut oracle = CommandOracle::new(
            vec!["sh".to_string(), "-c".to_string(), "echo nope >&2; exit 3".to_string()],
            "sqlite://",
        )
        .unwrap();
        let err = oracle.recognize(Duration::from_secs(1)).unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("recognizer failed"));
        assert!(message.contains("nope"));
    }
}
