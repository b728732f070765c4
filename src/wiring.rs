use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use cdp_bridge::ids::TabId;
use cdp_bridge::{TabAdapter, Tabs};
use handoff_core_types::RelayError;
use handoff_relay::{InjectPort, TabPort};
use tool_inject::{
    ExecCtx, InjectParams, InjectPolicyView, InjectReport, InjectTool, InjectToolBuilder, PagePort,
};

/// `TabPort` over the live adapter.
pub struct AdapterTabs {
    adapter: Arc<TabAdapter>,
}

impl AdapterTabs {
    pub fn new(adapter: Arc<TabAdapter>) -> Self {
        Self { adapter }
    }
}

#[async_trait]
impl TabPort for AdapterTabs {
    async fn open(&self, url: &str) -> Result<TabId, RelayError> {
        self.adapter.open_tab(url).await.map_err(Into::into)
    }

    async fn await_load(&self, tab: TabId, timeout: Duration) -> Result<(), RelayError> {
        self.adapter
            .wait_for_load(tab, timeout)
            .await
            .map_err(Into::into)
    }
}

/// `PagePort` scoped to one tab, so the injection tool never sees tab ids.
struct TabPage {
    adapter: Arc<TabAdapter>,
    tab: TabId,
}

const CLICK_DEADLINE: Duration = Duration::from_secs(5);

#[async_trait]
impl PagePort for TabPage {
    async fn field_exists(&self, selector: &str) -> Result<bool, RelayError> {
        self.adapter
            .query_exists(self.tab, selector)
            .await
            .map_err(Into::into)
    }

    async fn set_field_text(&self, selector: &str, text: &str) -> Result<(), RelayError> {
        self.adapter
            .set_field_text(self.tab, selector, text)
            .await
            .map_err(Into::into)
    }

    async fn press_enter(&self) -> Result<bool, RelayError> {
        self.adapter.press_enter(self.tab).await.map_err(Into::into)
    }

    async fn click_submit(&self, selector: &str) -> Result<(), RelayError> {
        self.adapter
            .click(self.tab, selector, CLICK_DEADLINE)
            .await
            .map_err(Into::into)
    }
}

/// `InjectPort` that builds a per-tab injection tool on demand.
pub struct AdapterInjector {
    adapter: Arc<TabAdapter>,
    policy: InjectPolicyView,
}

impl AdapterInjector {
    pub fn new(adapter: Arc<TabAdapter>, policy: InjectPolicyView) -> Self {
        Self { adapter, policy }
    }
}

#[async_trait]
impl InjectPort for AdapterInjector {
    async fn inject(
        &self,
        tab: TabId,
        ctx: ExecCtx,
        params: InjectParams,
    ) -> Result<InjectReport, RelayError> {
        let page = Arc::new(TabPage {
            adapter: Arc::clone(&self.adapter),
            tab,
        });
        let tool = InjectToolBuilder::new(self.policy.clone())
            .with_page(page)
            .build();
        tool.run(ctx, params).await
    }
}
