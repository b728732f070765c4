use async_trait::async_trait;

use handoff_core_types::RelayError;

/// One question the gate asks of the page: does this selector match anything
/// right now? Implementations decide how (a DevTools round-trip here; a
/// mutation-observer variant would slot in behind the same trait).
#[async_trait]
pub trait ProbePort: Send + Sync {
    async fn exists(&self, selector: &str) -> Result<bool, RelayError>;
}
