//! Wiring between the bridge's capability surface and the relay's ports,
//! plus the pieces the binary and the integration tests share.

pub mod wiring;

use std::sync::Arc;

use cdp_bridge::TabAdapter;
use handoff_relay::Relay;
use site_registry::SiteCatalog;
use tool_inject::InjectPolicyView;

use crate::wiring::{AdapterInjector, AdapterTabs};

/// Assemble a relay on top of a started adapter.
pub fn build_relay(adapter: Arc<TabAdapter>) -> Arc<Relay> {
    let tabs = Arc::new(AdapterTabs::new(Arc::clone(&adapter)));
    let injector = Arc::new(AdapterInjector::new(adapter, InjectPolicyView::default()));
    Arc::new(Relay::new(SiteCatalog::builtin(), tabs, injector))
}
