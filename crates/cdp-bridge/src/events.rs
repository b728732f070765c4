use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::ids::TabId;

/// Tab-level events emitted by the bridge.
///
/// Lifecycle phases follow the protocol's names lowercased: `init`,
/// `domcontentloaded`, `load`, `networkidle`, plus `opened` / `closed` for
/// target bookkeeping. Subscribers interested in "the tab finished loading"
/// watch for `load`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum TabEvent {
    Lifecycle {
        tab: TabId,
        phase: String,
        ts: u64,
    },
    Navigated {
        tab: TabId,
        url: String,
        ts: u64,
    },
    Error {
        tab: Option<TabId>,
        message: String,
    },
}

/// Shared event bus type used by the bridge.
pub type EventBus = broadcast::Sender<TabEvent>;

pub fn event_bus(capacity: usize) -> EventBus {
    let (sender, _) = broadcast::channel(capacity.max(1));
    sender
}
