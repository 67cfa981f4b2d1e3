//! Sampling loop: ask the oracle, hand the answer to the controller, repeat.
//!
//! The oracle blocks for about one window per call, so the loop paces itself.

use crate::controller::{Decision, MatchController};
use crate::invoker::ActionInvoker;
use crate::log_debug;
use crate::oracle::MatchOracle;
use crate::scheduler::Scheduler;
use std::time::Duration;

/// Counters for one sampling run.
///
/// `invoke_failures` counts actions that could not be started; exit status of
/// a started action only shows up in the log.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SamplingSummary {
    pub iterations: u32,
    pub matches_accepted: u32,
    pub actions_fired: u32,
    pub invoke_failures: u32,
    pub oracle_errors: u32,
}

impl SamplingSummary {
    pub fn render(&self) -> String {
        format!(
            "{} sample(s), {} match(es), {} action(s), {} action failure(s), {} recognizer error(s)",
            self.iterations,
            self.matches_accepted,
            self.actions_fired,
            self.invoke_failures,
            self.oracle_errors
        )
    }
}

/// Run `count` sampling iterations of `sample_window` each.
///
/// Recognizer failures are logged and the loop moves on; a flaky microphone
/// should not end the session.
pub fn run_sampling<O, S, A>(
    oracle: &mut O,
    controller: &MatchController<S, A>,
    sample_window: Duration,
    count: u32,
) -> SamplingSummary
where
    O: MatchOracle + ?Sized,
    S: Scheduler,
    A: ActionInvoker,
{
    let mut summary = SamplingSummary::default();
    let window_seconds = sample_window.as_secs_f64();
    for index in 0..count {
        let iteration = index + 1;
        log_debug(&format!("{iteration}/{count}"));
        summary.iterations = iteration;

        let event = match oracle.recognize(sample_window) {
            Ok(event) => event,
            Err(err) => {
                summary.oracle_errors += 1;
                log_debug(&format!("recognizer error on {iteration}/{count}: {err:#}"));
                tracing::warn!(iteration, error = %format!("{err:#}"), "recognizer failed");
                continue;
            }
        };

        let outcome = controller.handle(event, window_seconds);
        if outcome.event().is_some() {
            summary.matches_accepted += 1;
        }
        match outcome.decision() {
            Decision::Fired { .. } => summary.actions_fired += 1,
            Decision::InvokeFailed { .. } => summary.invoke_failures += 1,
            _ => {}
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ControllerConfig;
    use crate::matching::MatchEvent;
    use crate::registry::DurationRegistry;
    use crate::scheduler::ManualScheduler;
    use anyhow::{anyhow, Result};
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct ScriptedOracle {
        answers: VecDeque<Result<Option<MatchEvent>>>,
        windows: Vec<Duration>,
    }

    impl ScriptedOracle {
        fn new(answers: Vec<Result<Option<MatchEvent>>>) -> Self {
            Self {
                answers: answers.into(),
                windows: Vec::new(),
            }
        }
    }

    impl MatchOracle for ScriptedOracle {
        fn recognize(&mut self, sample_window: Duration) -> Result<Option<MatchEvent>> {
            self.windows.push(sample_window);
            self.answers.pop_front().unwrap_or(Ok(None))
        }
    }

    #[derive(Clone, Default)]
    struct CountingInvoker(Arc<AtomicUsize>);

    impl ActionInvoker for CountingInvoker {
        fn invoke(&self, _duration: Duration) -> Result<()> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn controller(
        invoker: CountingInvoker,
    ) -> MatchController<Arc<ManualScheduler>, CountingInvoker> {
        let registry: DurationRegistry = vec![("chantix".to_string(), 60.0)].into_iter().collect();
        MatchController::new(
            ControllerConfig::default(),
            registry,
            Arc::new(ManualScheduler::new()),
            invoker,
        )
    }

    #[test]
    fn runs_requested_iterations_with_fixed_window() {
        let invoker = CountingInvoker::default();
        let controller = controller(invoker.clone());
        let mut oracle = ScriptedOracle::new(Vec::new());
        let summary = run_sampling(&mut oracle, &controller, Duration::from_secs(5), 4);
        assert_eq!(summary.iterations, 4);
        assert_eq!(oracle.windows, vec![Duration::from_secs(5); 4]);
        assert_eq!(invoker.0.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn one_commercial_across_windows_fires_once() {
        let invoker = CountingInvoker::default();
        let controller = controller(invoker.clone());
        let mut oracle = ScriptedOracle::new(vec![
            Ok(None),
            Ok(Some(MatchEvent::new("chantix", 10, 0.0))),
            Ok(Some(MatchEvent::new("chantix", 146, 5.0))),
            Ok(Some(MatchEvent::new("chantix", 210, 10.0))),
            Ok(Some(MatchEvent::new("chantix", 180, 15.0))),
        ]);
        let summary = run_sampling(&mut oracle, &controller, Duration::from_secs(5), 5);
        assert_eq!(summary.matches_accepted, 3);
        assert_eq!(summary.actions_fired, 1);
        assert_eq!(invoker.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn recognizer_errors_do_not_stop_the_loop() {
        let invoker = CountingInvoker::default();
        let controller = controller(invoker.clone());
        let mut oracle = ScriptedOracle::new(vec![
            Err(anyhow!("microphone unplugged")),
            Err(anyhow!("microphone unplugged")),
            Ok(Some(MatchEvent::new("chantix", 146, 0.0))),
        ]);
        let summary = run_sampling(&mut oracle, &controller, Duration::from_secs(5), 3);
        assert_eq!(summary.oracle_errors, 2);
        assert_eq!(summary.actions_fired, 1);
        assert_eq!(
            summary.render(),
            "3 sample(s), 1 match(es), 1 action(s), 0 action failure(s), 2 recognizer error(s)"
        );
    }
}
