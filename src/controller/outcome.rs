use crate::matching::MatchEvent;
use crate::scheduler::TaskId;

/// What the controller did with one sampling result.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// The recognizer named nothing.
    NoMatch,
    /// Below the confidence threshold.
    LowConfidence { confidence: u32 },
    /// Recognized, but the registry has no duration for it.
    UnknownContent,
    /// Too little of the clip left to bother.
    TooShort { remaining_seconds: f64 },
    /// Remaining time too large to put on the clock; treated as bad data.
    Implausible { remaining_seconds: f64 },
    /// Would have fired, but the gate is closed.
    Suppressed { remaining_seconds: f64 },
    /// Could not arrange the re-enable, so the action was withheld.
    ScheduleFailed { error: String },
    Fired {
        remaining_seconds: f64,
        reenable: TaskId,
    },
    /// Gate closed and re-enable scheduled, but the action itself failed.
    InvokeFailed {
        remaining_seconds: f64,
        reenable: TaskId,
        error: String,
    },
}

impl Decision {
    pub fn label(&self) -> &'static str {
        match self {
            Decision::NoMatch => "no_match",
            Decision::LowConfidence { .. } => "low_confidence",
            Decision::UnknownContent => "unknown_content",
            Decision::TooShort { .. } => "too_short",
            Decision::Implausible { .. } => "implausible",
            Decision::Suppressed { .. } => "suppressed",
            Decision::ScheduleFailed { .. } => "schedule_failed",
            Decision::Fired { .. } => "fired",
            Decision::InvokeFailed { .. } => "invoke_failed",
        }
    }

    /// True when the gate was closed by this event (whether or not the action succeeded).
    pub fn closed_gate(&self) -> bool {
        matches!(self, Decision::Fired { .. } | Decision::InvokeFailed { .. })
    }

    /// Failures an operator should hear about.
    pub fn error(&self) -> Option<&str> {
        match self {
            Decision::ScheduleFailed { error } | Decision::InvokeFailed { error, .. } => {
                Some(error)
            }
            _ => None,
        }
    }
}

/// Result of [`super::MatchController::handle`].
///
/// `event` is present exactly when the confidence gate accepted the match,
/// regardless of whether anything fired.
#[derive(Debug, Clone, PartialEq)]
pub struct HandleOutcome {
    event: Option<MatchEvent>,
    decision: Decision,
}

impl HandleOutcome {
    pub(super) fn rejected(decision: Decision) -> Self {
        Self {
            event: None,
            decision,
        }
    }

    pub(super) fn accepted(event: MatchEvent, decision: Decision) -> Self {
        Self {
            event: Some(event),
            decision,
        }
    }

    pub fn event(&self) -> Option<&MatchEvent> {
        self.event.as_ref()
    }

    pub fn into_event(self) -> Option<MatchEvent> {
        self.event
    }

    pub fn decision(&self) -> &Decision {
        &self.decision
    }
}
