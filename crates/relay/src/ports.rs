use std::time::Duration;

use async_trait::async_trait;

use cdp_bridge::ids::TabId;
use handoff_core_types::RelayError;
use tool_inject::{ExecCtx, InjectParams, InjectReport};

/// Tab lifecycle surface the coordinator drives.
#[async_trait]
pub trait TabPort: Send + Sync {
    async fn open(&self, url: &str) -> Result<TabId, RelayError>;
    /// Resolve once the tab reports load-complete; the underlying listener
    /// is consumed by the first matching event.
    async fn await_load(&self, tab: TabId, timeout: Duration) -> Result<(), RelayError>;
}

/// One injection attempt on an already-loaded tab.
#[async_trait]
pub trait InjectPort: Send + Sync {
    async fn inject(
        &self,
        tab: TabId,
        ctx: ExecCtx,
        params: InjectParams,
    ) -> Result<InjectReport, RelayError>;
}
