use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use handoff_core_types::CommandId;

/// Execution context handed in by the coordinator for one injection attempt.
#[derive(Clone, Debug)]
pub struct ExecCtx {
    pub command_id: CommandId,
    pub deadline: Instant,
    pub cancel: CancellationToken,
}

impl ExecCtx {
    pub fn new(command_id: CommandId, deadline: Instant, cancel: CancellationToken) -> Self {
        Self {
            command_id,
            deadline,
            cancel,
        }
    }
}

/// Parameters for one injection attempt, resolved from the site profile.
#[derive(Clone, Debug)]
pub struct InjectParams {
    pub text: String,
    pub input_selector: String,
    pub submit_selector: String,
    /// Pause between setting the text and dispatching the submit keypress.
    pub settle_delay: Duration,
    /// Budget for the element gate.
    pub gate_budget: Duration,
}

/// Phases of one injection attempt, recorded in the order they were entered.
/// `WaitingForElements` is initial; `Done` and `TimedOut` are terminal.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub enum InjectPhase {
    WaitingForElements,
    ElementsFound,
    TextSet,
    EventDispatched,
    TimedOut,
    SubmitViaEvent,
    SubmitViaClick,
    Done,
}

impl InjectPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            InjectPhase::WaitingForElements => "waiting_for_elements",
            InjectPhase::ElementsFound => "elements_found",
            InjectPhase::TextSet => "text_set",
            InjectPhase::EventDispatched => "event_dispatched",
            InjectPhase::TimedOut => "timed_out",
            InjectPhase::SubmitViaEvent => "submit_via_event",
            InjectPhase::SubmitViaClick => "submit_via_click",
            InjectPhase::Done => "done",
        }
    }
}

/// Which of the two submit paths fired.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitPath {
    Event,
    Click,
}

/// Outcome of a completed injection attempt.
#[derive(Clone, Debug)]
pub struct InjectReport {
    pub ok: bool,
    pub phases: Vec<InjectPhase>,
    pub submit_path: Option<SubmitPath>,
    pub gate_attempts: u32,
    pub latency_ms: u128,
}

impl InjectReport {
    pub(crate) fn new() -> Self {
        Self {
            ok: false,
            phases: Vec::new(),
            submit_path: None,
            gate_attempts: 0,
            latency_ms: 0,
        }
    }

    pub(crate) fn enter(&mut self, phase: InjectPhase) {
        self.phases.push(phase);
    }

    pub(crate) fn finish(mut self, started_at: Instant) -> Self {
        self.latency_ms = started_at.elapsed().as_millis();
        self
    }
}
