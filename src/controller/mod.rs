//! Throttling match controller.
//!
//! Sampling windows overlap a commercial many times over, and each overlap
//! produces a match. The controller lets the first qualifying match through,
//! closes its gate, and asks the scheduler to reopen it when the clip should
//! be over. Everything in between is evaluated and reported but never acted
//! on.
//!
//! Gate changes and the scheduling that goes with them happen under one lock.
//! Each disable period gets a number; a re-enable task only reopens the gate
//! for the period it was created for, so a manual override or a later period
//! is never undone by a stale task.

mod outcome;

pub use outcome::{Decision, HandleOutcome};

use crate::config::ControllerConfig;
use crate::invoker::ActionInvoker;
use crate::matching::{remaining_seconds, ConfidenceGate, MatchEvent};
use crate::registry::DurationRegistry;
use crate::scheduler::{Scheduler, Task, TaskId};
use crate::{lock_or_recover, log_debug};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

#[derive(Debug)]
struct GateState {
    enabled: bool,
    period: u64,
    pending: Option<TaskId>,
}

impl Default for GateState {
    fn default() -> Self {
        Self {
            enabled: true,
            period: 0,
            pending: None,
        }
    }
}

pub struct MatchController<S, A> {
    gate: ConfidenceGate,
    min_remaining_seconds: f64,
    registry: DurationRegistry,
    scheduler: S,
    invoker: A,
    state: Arc<Mutex<GateState>>,
}

impl<S: Scheduler, A: ActionInvoker> MatchController<S, A> {
    pub fn new(
        config: ControllerConfig,
        registry: DurationRegistry,
        scheduler: S,
        invoker: A,
    ) -> Self {
        Self {
            gate: ConfidenceGate::new(config.confidence_min),
            min_remaining_seconds: config.min_remaining_seconds,
            registry,
            scheduler,
            invoker,
            state: Arc::new(Mutex::new(GateState::default())),
        }
    }

    /// Feed one sampling result through the gate.
    pub fn handle(&self, event: Option<MatchEvent>, sample_window_seconds: f64) -> HandleOutcome {
        let Some(event) = event else {
            return HandleOutcome::rejected(Decision::NoMatch);
        };
        if !self.gate.accept(&event) {
            let decision = if event.content_id.is_none() {
                Decision::NoMatch
            } else {
                Decision::LowConfidence {
                    confidence: event.confidence,
                }
            };
            log_debug(&rejection_message(&decision, self.gate.threshold()));
            return HandleOutcome::rejected(decision);
        }

        let decision = self.decide(&event, sample_window_seconds);
        self.report(&event, &decision);
        HandleOutcome::accepted(event, decision)
    }

    fn decide(&self, event: &MatchEvent, sample_window_seconds: f64) -> Decision {
        let content_id = event.content_id.as_deref().unwrap_or_default();
        let Some(duration_seconds) = self.registry.lookup(content_id) else {
            return Decision::UnknownContent;
        };
        let remaining =
            remaining_seconds(duration_seconds, event.offset_seconds, sample_window_seconds);
        // Written so that NaN falls on the "too short" side.
        if !(remaining >= self.min_remaining_seconds) {
            return Decision::TooShort {
                remaining_seconds: remaining,
            };
        }
        let Ok(hold) = Duration::try_from_secs_f64(remaining) else {
            return Decision::Implausible {
                remaining_seconds: remaining,
            };
        };

        let reenable = {
            let mut state = lock_or_recover(&self.state, "gate state");
            if !state.enabled {
                return Decision::Suppressed {
                    remaining_seconds: remaining,
                };
            }
            let Some(run_at) = Instant::now().checked_add(hold) else {
                return Decision::Implausible {
                    remaining_seconds: remaining,
                };
            };
            let period = state.period + 1;
            let task = reenable_task(self.state.clone(), period);
            match self.scheduler.schedule_at(run_at, task) {
                Ok(id) => {
                    state.enabled = false;
                    state.period = period;
                    state.pending = Some(id);
                    id
                }
                Err(err) => {
                    return Decision::ScheduleFailed {
                        error: format!("{err:#}"),
                    }
                }
            }
        };

        // Gate is already closed and its reopening booked, so a failing
        // action cannot leave it stuck.
        match self.invoker.invoke(hold) {
            Ok(()) => Decision::Fired {
                remaining_seconds: remaining,
                reenable,
            },
            Err(err) => Decision::InvokeFailed {
                remaining_seconds: remaining,
                reenable,
                error: format!("{err:#}"),
            },
        }
    }

    fn report(&self, event: &MatchEvent, decision: &Decision) {
        let content_id = event.content_id.as_deref().unwrap_or_default();
        match decision {
            Decision::Fired {
                remaining_seconds,
                reenable,
            } => {
                log_debug(&format!(
                    "volume action for '{content_id}' ({remaining_seconds:.1}s left), gate reopens via {reenable}"
                ));
                tracing::info!(
                    content_id,
                    confidence = event.confidence,
                    remaining_s = *remaining_seconds,
                    task = reenable.get(),
                    "volume action fired"
                );
            }
            Decision::InvokeFailed {
                remaining_seconds,
                reenable,
                error,
            } => {
                log_debug(&format!(
                    "volume action for '{content_id}' failed: {error} (gate reopens via {reenable})"
                ));
                tracing::warn!(
                    content_id,
                    remaining_s = *remaining_seconds,
                    error = error.as_str(),
                    "volume action failed"
                );
            }
            Decision::ScheduleFailed { error } => {
                log_debug(&format!(
                    "could not schedule re-enable for '{content_id}': {error}"
                ));
                tracing::error!(content_id, error = error.as_str(), "re-enable scheduling failed");
            }
            other => {
                log_debug(&format!(
                    "match '{content_id}' (confidence {}, offset {:.2}s): {}",
                    event.confidence,
                    event.offset_seconds,
                    other.label()
                ));
                tracing::debug!(
                    content_id,
                    confidence = event.confidence,
                    decision = other.label(),
                    "match not acted on"
                );
            }
        }
    }

    /// Manual override. Also cancels the effect of any pending re-enable:
    /// after `set_enabled(false)` the gate stays closed until `set_enabled(true)`.
    pub fn set_enabled(&self, enabled: bool) {
        let mut state = lock_or_recover(&self.state, "gate state");
        state.enabled = enabled;
        state.period += 1;
        if let Some(stale) = state.pending.take() {
            log_debug(&format!("manual override supersedes {stale}"));
        }
        log_debug(&format!("gate manually set to enabled={enabled}"));
    }

    pub fn is_enabled(&self) -> bool {
        lock_or_recover(&self.state, "gate state").enabled
    }

    /// Re-enable task currently expected to reopen the gate.
    pub fn pending_reenable(&self) -> Option<TaskId> {
        lock_or_recover(&self.state, "gate state").pending
    }

    pub fn registry(&self) -> &DurationRegistry {
        &self.registry
    }
}

fn rejection_message(decision: &Decision, threshold: u32) -> String {
    match decision {
        Decision::LowConfidence { confidence } => format!(
            "match rejected: {} (confidence {confidence} < {threshold})",
            decision.label()
        ),
        other => format!("match rejected: {}", other.label()),
    }
}

fn reenable_task(state: Arc<Mutex<GateState>>, period: u64) -> Task {
    Box::new(move || {
        let mut state = lock_or_recover(&state, "gate state");
        if state.period != period {
            log_debug(&format!(
                "stale re-enable for period {period} ignored (current period {})",
                state.period
            ));
            return;
        }
        state.enabled = true;
        state.pending = None;
        log_debug("gate re-enabled");
        tracing::debug!(period, "gate re-enabled");
    })
}
