use async_trait::async_trait;

use handoff_core_types::{CommandId, RelayError};

use crate::model::InjectPhase;

/// Capability surface the runner needs from the destination page.
#[async_trait]
pub trait PagePort: Send + Sync {
    async fn field_exists(&self, selector: &str) -> Result<bool, RelayError>;
    /// Set the field's value and dispatch bubbling `input` and `change`
    /// notifications so a reactive front-end registers the edit.
    async fn set_field_text(&self, selector: &str, text: &str) -> Result<(), RelayError>;
    /// Dispatch a synthetic Enter keydown at the document level; the return
    /// value reports whether the page marked the event handled.
    async fn press_enter(&self) -> Result<bool, RelayError>;
    async fn click_submit(&self, selector: &str) -> Result<(), RelayError>;
}

#[async_trait]
pub trait EventsPort: Send + Sync {
    async fn emit_phase(&self, command: &CommandId, phase: InjectPhase);
    async fn emit_finished(&self, command: &CommandId, ok: bool);
}
