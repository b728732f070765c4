use async_trait::async_trait;
use tracing::debug;

use handoff_core_types::CommandId;

use crate::model::InjectPhase;
use crate::ports::EventsPort;

/// Default emitter: phase transitions go to the log stream.
#[derive(Clone, Debug, Default)]
pub struct LogEvents;

#[async_trait]
impl EventsPort for LogEvents {
    async fn emit_phase(&self, command: &CommandId, phase: InjectPhase) {
        debug!(target: "tool-inject", command = %command, phase = phase.as_str(), "phase");
    }

    async fn emit_finished(&self, command: &CommandId, ok: bool) {
        debug!(target: "tool-inject", command = %command, ok, "finished");
    }
}
