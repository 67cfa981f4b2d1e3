//! Throttled commercial-break volume control.
//!
//! A sampling loop asks an external recognizer what is playing, and the
//! [`controller::MatchController`] turns those noisy answers into at most one
//! downstream action per matched clip, re-arming itself through a
//! [`scheduler::Scheduler`] once the clip should be over.

mod app;
pub mod config;
pub mod controller;
pub mod doctor;
pub mod driver;
pub mod invoker;
mod lock;
pub mod matching;
pub mod oracle;
pub mod registry;
pub mod scheduler;
mod telemetry;

pub(crate) use lock::lock_or_recover;
pub use app::logging::{crash_log_path, init_logging, log_debug, log_file_path, log_panic};
pub use matching::{remaining_seconds, ConfidenceGate, MatchEvent};
pub use telemetry::{init_tracing, tracing_log_path};
