//! Downstream volume action.
//!
//! How the TV is actually turned down is somebody else's program; we only
//! start it with the duration and move on.

use crate::log_debug;
use anyhow::{anyhow, bail, Context, Result};
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;

/// Performs the physical action for `duration`.
///
/// Implementations must return promptly: the sampling loop is waiting.
/// Retrying is the implementation's business, not the caller's.
///
/// An `Err` means the action could not be started. Anything that goes wrong
/// after that is the implementation's to log; it is not reported back.
pub trait ActionInvoker: Send + Sync {
    fn invoke(&self, duration: Duration) -> Result<()>;
}

impl<A: ActionInvoker + ?Sized> ActionInvoker for Box<A> {
    fn invoke(&self, duration: Duration) -> Result<()> {
        (**self).invoke(duration)
    }
}

/// Runs `<argv...> --duration-seconds <S>` without waiting for it to finish.
///
/// Only spawn failures are returned. A non-zero exit is logged by the reaper
/// thread once the child finishes.
pub struct CommandInvoker {
    argv: Vec<String>,
}

impl CommandInvoker {
    pub fn new(argv: Vec<String>) -> Result<Self> {
        if argv.first().map_or(true, |program| program.trim().is_empty()) {
            bail!("action command cannot be empty");
        }
        Ok(Self { argv })
    }

    fn command(&self, duration: Duration) -> Command {
        let mut cmd = Command::new(&self.argv[0]);
        cmd.args(&self.argv[1..]);
        cmd.args([
            "--duration-seconds".to_string(),
            format!("{:.1}", duration.as_secs_f64()),
        ]);
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::null());
        cmd.stderr(Stdio::piped());
        cmd
    }
}

impl ActionInvoker for CommandInvoker {
    fn invoke(&self, duration: Duration) -> Result<()> {
        let program = self.argv[0].clone();
        let mut child = self
            .command(duration)
            .spawn()
            .with_context(|| format!("failed to start action command '{program}'"))?;
        log_debug(&format!(
            "action '{program}' started (pid {}) for {:.1}s",
            child.id(),
            duration.as_secs_f64()
        ));

        // Reap on the side so the sampling loop never waits on the TV.
        thread::Builder::new()
            .name("quietbreak-action".to_string())
            .spawn(move || match child.wait_with_output() {
                Ok(output) if output.status.success() => {
                    log_debug(&format!("action '{program}' finished"));
                }
                Ok(output) => {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    log_debug(&format!(
                        "action '{program}' failed with status {}: {}",
                        output.status,
                        stderr.trim()
                    ));
                    tracing::warn!(
                        program = %program,
                        status = %output.status,
                        "action command failed"
                    );
                }
                Err(err) => log_debug(&format!("action '{program}' wait failed: {err}")),
            })
            .map_err(|err| anyhow!("failed to watch action command: {err}"))?;
        Ok(())
    }
}

/// Dry-run invoker used when no action command is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogInvoker;

impl ActionInvoker for LogInvoker {
    fn invoke(&self, duration: Duration) -> Result<()> {
        log_debug(&format!(
            "dry run: would lower volume for {:.1}s",
            duration.as_secs_f64()
        ));
        tracing::info!(duration_s = duration.as_secs_f64(), "dry-run volume action");
        Ok(())
    }
}
