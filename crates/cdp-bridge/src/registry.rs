//! Bookkeeping for the tabs the bridge currently knows about.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::ids::TabId;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TabContext {
    pub target_id: Option<String>,
    pub cdp_session: Option<String>,
    pub recent_url: Option<String>,
}

/// Concurrent registry mapping tab handles to their protocol identities.
pub struct TabRegistry {
    tabs: DashMap<TabId, TabContext>,
}

impl TabRegistry {
    pub fn new() -> Self {
        Self {
            tabs: DashMap::new(),
        }
    }

    pub fn insert_tab(&self, tab: TabId, target_id: Option<String>, cdp_session: Option<String>) {
        let ctx = TabContext {
            target_id,
            cdp_session,
            recent_url: None,
        };
        self.tabs.insert(tab, ctx);
    }

    pub fn remove_tab(&self, tab: &TabId) {
        self.tabs.remove(tab);
    }

    pub fn get(&self, tab: &TabId) -> Option<TabContext> {
        self.tabs.get(tab).map(|entry| entry.value().clone())
    }

    pub fn iter(&self) -> Vec<(TabId, TabContext)> {
        self.tabs
            .iter()
            .map(|kv| (*kv.key(), kv.value().clone()))
            .collect()
    }

    pub fn set_recent_url(&self, tab: &TabId, url: String) {
        if let Some(mut entry) = self.tabs.get_mut(tab) {
            entry.recent_url = Some(url);
        }
    }

    pub fn set_cdp_session(&self, tab: &TabId, session: String) {
        if let Some(mut entry) = self.tabs.get_mut(tab) {
            entry.cdp_session = Some(session);
        }
    }

    pub fn get_cdp_session(&self, tab: &TabId) -> Option<String> {
        self.tabs
            .get(tab)
            .and_then(|entry| entry.cdp_session.clone())
    }
}

impl Default for TabRegistry {
    fn default() -> Self {
        Self::new()
    }
}
