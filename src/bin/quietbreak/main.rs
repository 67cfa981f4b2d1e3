//! quietbreak entrypoint.
//!
//! Samples the room through the recognizer, and when a known commercial is
//! playing with enough of it left, turns the TV down once for the rest of it.
//!
//! # Threads
//!
//! - Main thread: the sampling loop (blocks on the recognizer each window)
//! - Scheduler worker: reopens the gate when a commercial should be over
//! - Action reapers: one short-lived thread per volume action

use anyhow::Result;
use clap::Parser;
use quietbreak::config::{resolve_database_url, AppConfig};
use quietbreak::controller::MatchController;
use quietbreak::doctor::base_doctor_report;
use quietbreak::driver::run_sampling;
use quietbreak::invoker::{ActionInvoker, CommandInvoker, LogInvoker};
use quietbreak::oracle::CommandOracle;
use quietbreak::registry::DurationRegistry;
use quietbreak::scheduler::BackgroundScheduler;
use quietbreak::{init_logging, init_tracing, log_debug, log_file_path, log_panic};
use std::panic;
use std::sync::Arc;
use std::time::Duration;

fn install_panic_hook() {
    let previous = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        log_panic(info);
        previous(info);
    }));
}

fn main() -> Result<()> {
    let mut config = AppConfig::parse();
    if config.doctor {
        println!("{}", base_doctor_report(&config, "quietbreak").render());
        return Ok(());
    }

    config.validate()?;
    init_logging(&config);
    init_tracing(&config);
    install_panic_hook();
    log_debug("=== quietbreak started ===");
    log_debug(&format!("Log file: {:?}", log_file_path()));

    let registry = DurationRegistry::load(&config.durations);
    if registry.is_empty() {
        eprintln!(
            "quietbreak: no clip durations loaded from {}; matches will be logged but never acted on",
            config.durations.display()
        );
    }

    let database_url = resolve_database_url(&config.config_file);
    let mut oracle = CommandOracle::new(config.recognizer_argv()?, database_url)?
        .with_timings(config.log_timings);

    let invoker: Box<dyn ActionInvoker> = match config.action_argv()? {
        Some(argv) => Box::new(CommandInvoker::new(argv)?),
        None => {
            eprintln!("quietbreak: no --action-cmd set; running as a dry run");
            Box::new(LogInvoker)
        }
    };

    // One scheduler for the life of the process.
    let scheduler = Arc::new(BackgroundScheduler::start()?);
    let controller = MatchController::new(
        config.controller_config(),
        registry,
        scheduler.clone(),
        invoker,
    );

    let sample_window = Duration::from_secs(config.seconds);
    log_debug(&format!(
        "sampling {}x{}s against {} known clip(s)",
        config.count,
        config.seconds,
        controller.registry().len()
    ));
    let summary = run_sampling(&mut oracle, &controller, sample_window, config.count);

    log_debug(&format!("=== quietbreak finished: {} ===", summary.render()));
    if scheduler.pending() > 0 {
        log_debug("exiting with a gate re-enable still pending");
    }
    println!("quietbreak: {}", summary.render());
    Ok(())
}
