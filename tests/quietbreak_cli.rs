use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};

fn combined_output(output: &std::process::Output) -> String {
    let mut combined = String::new();
    combined.push_str(&String::from_utf8_lossy(&output.stdout));
    combined.push_str(&String::from_utf8_lossy(&output.stderr));
    combined
}

fn quietbreak_bin() -> &'static str {
    option_env!("CARGO_BIN_EXE_quietbreak").expect("quietbreak test binary not built")
}

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("quietbreak_cli_{}_{name}", std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).expect("create scratch dir");
    dir
}

#[cfg(unix)]
fn write_script(path: &Path, body: &str) {
    use std::os::unix::fs::PermissionsExt;
    fs::write(path, format!("#!/bin/sh\n{body}\n")).expect("write script");
    fs::set_permissions(path, fs::Permissions::from_mode(0o755)).expect("chmod script");
}

#[test]
fn quietbreak_help_mentions_name() {
    let output = Command::new(quietbreak_bin())
        .arg("--help")
        .output()
        .expect("run quietbreak --help");
    assert!(output.status.success());
    let combined = combined_output(&output);
    assert!(combined.contains("quietbreak"));
    assert!(combined.contains("--confidence-min"));
}

#[test]
fn quietbreak_doctor_prints_report() {
    let output = Command::new(quietbreak_bin())
        .args(["--doctor", "--min-remaining-seconds", "10"])
        .output()
        .expect("run quietbreak --doctor");
    assert!(output.status.success());
    let combined = combined_output(&output);
    assert!(combined.contains("quietbreak doctor"));
    assert!(combined.contains("min_remaining_s: 10"));
}

#[test]
fn quietbreak_rejects_invalid_window() {
    let output = Command::new(quietbreak_bin())
        .args(["--seconds", "0"])
        .output()
        .expect("run quietbreak --seconds 0");
    assert!(!output.status.success());
    assert!(combined_output(&output).contains("--seconds must be between"));
}

#[cfg(unix)]
#[test]
fn quietbreak_fires_action_once_per_commercial() {
    let dir = scratch_dir("fires_once");
    let durations = dir.join("durations.json");
    fs::write(&durations, r#"{"chantix": 60.0}"#).unwrap();

    let recognizer = dir.join("recognize.sh");
    write_script(
        &recognizer,
        r#"echo "* recording"
echo '{"song_id": 12, "song_name": "chantix", "confidence": 43335, "offset_seconds": 0.0}'"#,
    );
    let calls = dir.join("calls.log");
    let action = dir.join("action.sh");
    write_script(&action, &format!("echo \"$@\" >> '{}'", calls.display()));

    let output = Command::new(quietbreak_bin())
        .args(["--count", "3", "--seconds", "1"])
        .arg("--durations")
        .arg(&durations)
        .arg("--config-file")
        .arg(dir.join("missing-config.json"))
        .arg("--recognizer-cmd")
        .arg(&recognizer)
        .arg("--action-cmd")
        .arg(&action)
        .env_remove("QUIETBREAK_RECOGNIZER_CMD")
        .env_remove("QUIETBREAK_ACTION_CMD")
        .output()
        .expect("run quietbreak sampling");
    let combined = combined_output(&output);
    assert!(output.status.success(), "{combined}");
    assert!(
        combined.contains("3 sample(s), 3 match(es), 1 action(s)"),
        "{combined}"
    );

    // The action runs detached; give it a moment to land.
    let deadline = Instant::now() + Duration::from_secs(5);
    let mut logged = String::new();
    while Instant::now() < deadline {
        logged = fs::read_to_string(&calls).unwrap_or_default();
        if !logged.is_empty() {
            break;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    assert_eq!(logged.trim(), "--duration-seconds 59.0");
    let _ = fs::remove_dir_all(&dir);
}

#[cfg(unix)]
#[test]
fn quietbreak_survives_missing_durations_file() {
    let dir = scratch_dir("no_durations");
    let recognizer = dir.join("recognize.sh");
    write_script(&recognizer, "echo null");

    let output = Command::new(quietbreak_bin())
        .args(["--count", "1", "--seconds", "1"])
        .arg("--durations")
        .arg(dir.join("absent.json"))
        .arg("--config-file")
        .arg(dir.join("absent-config.json"))
        .arg("--recognizer-cmd")
        .arg(&recognizer)
        .env_remove("QUIETBREAK_ACTION_CMD")
        .output()
        .expect("run quietbreak without durations");
    let combined = combined_output(&output);
    assert!(output.status.success(), "{combined}");
    assert!(combined.contains("no clip durations loaded"));
    assert!(combined.contains("dry run"));
    let _ = fs::remove_dir_all(&dir);
}
