use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use dashmap::DashMap;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio::{select, spawn};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::BridgeConfig;
use crate::error::{BridgeError, BridgeErrorKind};
use crate::events::{EventBus, TabEvent};
use crate::ids::{BrowserId, TabId};
use crate::registry::TabRegistry;
use crate::transport::{
    CdpTransport, ChromiumTransport, CommandTarget, NoopTransport, TransportEvent,
};
use crate::{chrome_mode, resolve_chrome_path, BridgeMode, ChromeMode};

/// Element-scoped script used by `set_field_text`: write the value and let
/// the page's framework hear about it, the way a user edit would bubble.
const SET_TEXT_FN: &str = r#"
function(text) {
    if (!this) { return { status: 'not-found' }; }
    this.value = text;
    this.dispatchEvent(new Event('input', { bubbles: true }));
    this.dispatchEvent(new Event('change', { bubbles: true }));
    if (typeof this.focus === 'function') { this.focus(); }
    return { status: 'set' };
}
"#;

/// Document-level synthetic Enter. `dispatchEvent` returns false when some
/// listener called preventDefault, which is the only signal the page gives
/// that it acted on the keypress.
const PRESS_ENTER_EXPR: &str = r#"
(() => {
    const ev = new KeyboardEvent('keydown', {
        key: 'Enter',
        code: 'Enter',
        keyCode: 13,
        which: 13,
        bubbles: true,
        cancelable: true,
        composed: true
    });
    const unprevented = document.dispatchEvent(ev);
    return { handled: !unprevented };
})()
"#;

/// Capability surface the relay and the injection tool wire against.
#[async_trait]
pub trait Tabs: Send + Sync {
    async fn open_tab(&self, url: &str) -> Result<TabId, BridgeError>;
    async fn close_tab(&self, tab: TabId) -> Result<(), BridgeError>;
    /// Resolve once the tab reports load-complete. The underlying
    /// subscription is consumed by the first matching event and dropped on
    /// every exit path, so a second load of the same tab is never observed
    /// through a stale listener.
    async fn wait_for_load(&self, tab: TabId, timeout: Duration) -> Result<(), BridgeError>;
    async fn query_exists(&self, tab: TabId, selector: &str) -> Result<bool, BridgeError>;
    async fn set_field_text(
        &self,
        tab: TabId,
        selector: &str,
        text: &str,
    ) -> Result<(), BridgeError>;
    async fn press_enter(&self, tab: TabId) -> Result<bool, BridgeError>;
    async fn click(
        &self,
        tab: TabId,
        selector: &str,
        deadline: Duration,
    ) -> Result<(), BridgeError>;
    fn subscribe(&self) -> broadcast::Receiver<TabEvent>;
}

/// Bridge implementation with pluggable transport.
pub struct TabAdapter {
    pub browser_id: BrowserId,
    pub cfg: BridgeConfig,
    pub bus: EventBus,
    pub registry: Arc<TabRegistry>,
    mode: BridgeMode,
    shutdown: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    transport: Arc<dyn CdpTransport>,
    targets: DashMap<String, TabId>,
    sessions: DashMap<String, TabId>,
}

impl TabAdapter {
    pub fn new(mut cfg: BridgeConfig, bus: EventBus) -> Self {
        let mode = chrome_mode();
        let detected = resolve_chrome_path(&cfg);
        let wants_stub = matches!(mode, ChromeMode::ForceStub);
        let mut use_real = cfg.websocket_url.is_some() || matches!(mode, ChromeMode::ForceReal);
        if !use_real && !wants_stub {
            use_real = detected.is_some();
        }

        if use_real && cfg.websocket_url.is_none() {
            if let Some(path) = detected {
                cfg.executable = path;
            } else {
                if matches!(mode, ChromeMode::ForceReal) {
                    panic!("Chrome/Chromium executable not found while HANDOFF_USE_REAL_CHROME=1");
                }
                warn!(
                    target: "cdp-bridge",
                    "Chrome executable not found; falling back to stub transport"
                );
                use_real = false;
            }
        }

        let transport: Arc<dyn CdpTransport> = if use_real {
            info!(target: "cdp-bridge", "using real Chromium transport");
            Arc::new(ChromiumTransport::new(cfg.clone()))
        } else {
            warn!(
                target: "cdp-bridge",
                "bridge initialized without a real browser; tab automation is disabled \
                 (install Chrome/Chromium or set HANDOFF_CHROME=/path/to/chrome)"
            );
            Arc::new(NoopTransport)
        };
        Self::with_transport(cfg, bus, transport, if use_real {
            BridgeMode::Real
        } else {
            BridgeMode::Stub
        })
    }

    pub fn with_transport(
        cfg: BridgeConfig,
        bus: EventBus,
        transport: Arc<dyn CdpTransport>,
        mode: BridgeMode,
    ) -> Self {
        Self {
            browser_id: BrowserId::new(),
            cfg,
            bus,
            registry: Arc::new(TabRegistry::new()),
            mode,
            shutdown: CancellationToken::new(),
            tasks: Mutex::new(Vec::new()),
            transport,
            targets: DashMap::new(),
            sessions: DashMap::new(),
        }
    }

    pub fn mode(&self) -> BridgeMode {
        self.mode
    }

    pub fn registry(&self) -> Arc<TabRegistry> {
        Arc::clone(&self.registry)
    }

    pub fn cancel_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub async fn start(self: Arc<Self>) -> Result<(), BridgeError> {
        {
            let guard = self.tasks.lock().await;
            if !guard.is_empty() {
                return Ok(());
            }
        }

        self.transport.start().await?;
        let loop_task = spawn(Self::event_loop(Arc::clone(&self)));
        self.tasks.lock().await.push(loop_task);
        debug!(target: "cdp-bridge", "event loop started");
        Ok(())
    }

    pub async fn shutdown(&self) {
        self.shutdown.cancel();
        let mut handles = self.tasks.lock().await;
        while let Some(handle) = handles.pop() {
            let _ = handle.await;
        }
    }

    async fn event_loop(self: Arc<Self>) {
        const MIN_BACKOFF: Duration = Duration::from_millis(100);
        const MAX_BACKOFF: Duration = Duration::from_secs(5);
        let mut backoff = MIN_BACKOFF;

        loop {
            select! {
                _ = self.shutdown.cancelled() => {
                    break;
                }
                event = self.transport.next_event() => {
                    match event {
                        Some(ev) => {
                            backoff = MIN_BACKOFF;
                            self.handle_event(ev).await;
                        }
                        None => {
                            if self.shutdown.is_cancelled() {
                                break;
                            }
                            if self.mode.is_stub() {
                                // the noop transport never produces events
                                self.shutdown.cancelled().await;
                                break;
                            }
                            self.handle_transport_disconnect();
                            warn!(target: "cdp-bridge", "transport stream ended; attempting restart");
                            if let Err(err) = self.transport.start().await {
                                warn!(target: "cdp-bridge", ?err, "transport restart failed");
                            }
                            if self.shutdown.is_cancelled() {
                                break;
                            }
                            sleep(backoff).await;
                            backoff = (backoff + MIN_BACKOFF).min(MAX_BACKOFF);
                        }
                    }
                }
            }
        }
        debug!(target: "cdp-bridge", "event loop exiting");
    }

    fn handle_transport_disconnect(&self) {
        for (tab, _) in self.registry.iter() {
            self.emit_lifecycle(tab, "closed");
            self.registry.remove_tab(&tab);
        }
        self.targets.clear();
        self.sessions.clear();

        let _ = self.bus.send(TabEvent::Error {
            tab: None,
            message: "cdp transport restarted; open tabs were reset".to_string(),
        });
    }

    async fn handle_event(&self, event: TransportEvent) {
        if let Err(err) = self.process_event(event).await {
            let _ = self.bus.send(TabEvent::Error {
                tab: None,
                message: format!("cdp event handling error: {:?}", err),
            });
        }
    }

    async fn process_event(&self, event: TransportEvent) -> Result<(), BridgeError> {
        match event.method.as_str() {
            "Target.targetCreated" => self.on_target_created(event.params)?,
            "Target.targetDestroyed" => self.on_target_destroyed(event.params)?,
            "Target.attachedToTarget" => self.on_target_attached(event.params)?,
            "Target.detachedFromTarget" => self.on_target_detached(event.params)?,
            "Target.targetInfoChanged" => self.on_target_info_changed(event.params)?,
            "Page.lifecycleEvent" => self.on_page_lifecycle(event)?,
            other => {
                debug!(target: "cdp-bridge", method = %other, "unhandled cdp event");
            }
        }
        Ok(())
    }

    fn on_target_created(&self, params: Value) -> Result<(), BridgeError> {
        let payload: TargetCreatedParams = decode(params)?;
        if payload.target_info.target_type != "page" {
            return Ok(());
        }

        let target_id = payload.target_info.target_id;
        let tab = TabId::new();
        self.targets.insert(target_id.clone(), tab);
        self.registry.insert_tab(tab, Some(target_id), None);

        if let Some(url) = payload.target_info.url.filter(|u| !u.is_empty()) {
            self.registry.set_recent_url(&tab, url);
        }

        self.emit_lifecycle(tab, "opened");
        Ok(())
    }

    fn on_target_destroyed(&self, params: Value) -> Result<(), BridgeError> {
        let payload: TargetDestroyedParams = decode(params)?;
        if let Some((_, tab)) = self.targets.remove(&payload.target_id) {
            self.sessions.retain(|_, v| *v != tab);
            self.registry.remove_tab(&tab);
            self.emit_lifecycle(tab, "closed");
        }
        Ok(())
    }

    fn on_target_attached(&self, params: Value) -> Result<(), BridgeError> {
        let payload: AttachedToTargetParams = decode(params)?;
        if payload.target_info.target_type != "page" {
            return Ok(());
        }

        if let Some(entry) = self.targets.get(&payload.target_info.target_id) {
            let tab = *entry.value();
            self.sessions.insert(payload.session_id.clone(), tab);
            self.registry
                .set_cdp_session(&tab, payload.session_id.clone());
            self.spawn_enable_lifecycle(payload.session_id);
        }
        Ok(())
    }

    fn on_target_detached(&self, params: Value) -> Result<(), BridgeError> {
        let payload: DetachedFromTargetParams = decode(params)?;
        self.sessions.remove(&payload.session_id);
        Ok(())
    }

    fn on_target_info_changed(&self, params: Value) -> Result<(), BridgeError> {
        let payload: TargetInfoChangedParams = decode(params)?;
        if payload.target_info.target_type != "page" {
            return Ok(());
        }

        if let Some(entry) = self.targets.get(&payload.target_info.target_id) {
            let tab = *entry.value();
            if let Some(url) = payload.target_info.url.filter(|u| !u.is_empty()) {
                self.registry.set_recent_url(&tab, url.clone());
                let _ = self.bus.send(TabEvent::Navigated {
                    tab,
                    url,
                    ts: timestamp_now(),
                });
            }
        }
        Ok(())
    }

    fn on_page_lifecycle(&self, event: TransportEvent) -> Result<(), BridgeError> {
        let payload: PageLifecycleParams = decode(event.params)?;
        if let Some(tab) = self.tab_from_session(event.session_id.as_ref()) {
            self.emit_lifecycle(tab, &payload.name.to_ascii_lowercase());
        }
        Ok(())
    }

    /// Lifecycle events are opt-in per session; without this the load phase
    /// never arrives.
    fn spawn_enable_lifecycle(&self, session_id: String) {
        let transport = Arc::clone(&self.transport);
        spawn(async move {
            let target = CommandTarget::Session(session_id);
            if let Err(err) = transport
                .send_command(target.clone(), "Page.enable", json!({}))
                .await
            {
                warn!(target: "cdp-bridge", ?err, "Page.enable failed");
                return;
            }
            if let Err(err) = transport
                .send_command(
                    target,
                    "Page.setLifecycleEventsEnabled",
                    json!({ "enabled": true }),
                )
                .await
            {
                warn!(target: "cdp-bridge", ?err, "enabling lifecycle events failed");
            }
        });
    }

    fn tab_from_session(&self, session: Option<&String>) -> Option<TabId> {
        session.and_then(|sid| self.sessions.get(sid).map(|entry| *entry.value()))
    }

    fn emit_lifecycle(&self, tab: TabId, phase: &str) {
        let _ = self.bus.send(TabEvent::Lifecycle {
            tab,
            phase: phase.to_string(),
            ts: timestamp_now(),
        });
    }

    async fn send_command(&self, method: &str, params: Value) -> Result<Value, BridgeError> {
        self.transport
            .send_command(CommandTarget::Browser, method, params)
            .await
    }

    async fn send_tab_command(
        &self,
        tab: TabId,
        method: &str,
        params: Value,
    ) -> Result<Value, BridgeError> {
        let session = self.registry.get_cdp_session(&tab).ok_or_else(|| {
            BridgeError::new(BridgeErrorKind::Internal)
                .with_hint(format!("missing cdp session for tab {tab:?}"))
        })?;
        self.transport
            .send_command(CommandTarget::Session(session), method, params)
            .await
    }

    async fn evaluate(&self, tab: TabId, expression: &str) -> Result<Value, BridgeError> {
        let response = self
            .send_tab_command(
                tab,
                "Runtime.evaluate",
                json!({
                    "expression": expression,
                    "returnByValue": true,
                }),
            )
            .await?;
        Ok(response
            .get("result")
            .and_then(|res| res.get("value"))
            .cloned()
            .unwrap_or(Value::Null))
    }

    async fn wait_for_attach(&self, target_id: &str) -> Result<TabId, BridgeError> {
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            if let Some(entry) = self.targets.get(target_id) {
                let tab = *entry.value();
                if self
                    .registry
                    .get(&tab)
                    .map(|ctx| ctx.cdp_session.is_some())
                    .unwrap_or(false)
                {
                    return Ok(tab);
                }
            }

            if Instant::now() >= deadline {
                return Err(BridgeError::new(BridgeErrorKind::Internal)
                    .with_hint("timed out waiting for target attach"));
            }

            sleep(Duration::from_millis(50)).await;
        }
    }

    fn selector_literal(selector: &str) -> Result<String, BridgeError> {
        serde_json::to_string(selector)
            .map_err(|err| BridgeError::new(BridgeErrorKind::Internal).with_hint(err.to_string()))
    }

    /// Resolve the element once and hand back its remote object id for a
    /// `Runtime.callFunctionOn` round-trip.
    async fn resolve_object_id(
        &self,
        tab: TabId,
        selector: &str,
    ) -> Result<String, BridgeError> {
        let literal = Self::selector_literal(selector)?;
        let response = self
            .send_tab_command(
                tab,
                "Runtime.evaluate",
                json!({
                    "expression": format!("document.querySelector({literal})"),
                    "objectGroup": "handoff-inject",
                    "returnByValue": false,
                }),
            )
            .await?;

        response
            .get("result")
            .and_then(|res| res.get("objectId"))
            .and_then(|val| val.as_str())
            .map(|s| s.to_string())
            .ok_or_else(|| {
                BridgeError::new(BridgeErrorKind::TargetNotFound)
                    .with_hint(format!("no element matches selector '{selector}'"))
            })
    }
}

#[async_trait]
impl Tabs for TabAdapter {
    async fn open_tab(&self, url: &str) -> Result<TabId, BridgeError> {
        let response = self
            .send_command("Target.createTarget", json!({ "url": url }))
            .await?;
        let target_id = response
            .get("targetId")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                BridgeError::new(BridgeErrorKind::Internal)
                    .with_hint("createTarget missing targetId")
            })?
            .to_string();

        let tab = self.wait_for_attach(&target_id).await?;
        self.registry.set_recent_url(&tab, url.to_string());
        debug!(target: "cdp-bridge", ?tab, url, "tab opened");
        Ok(tab)
    }

    async fn close_tab(&self, tab: TabId) -> Result<(), BridgeError> {
        let target_id = self
            .registry
            .get(&tab)
            .and_then(|ctx| ctx.target_id)
            .ok_or_else(|| {
                BridgeError::new(BridgeErrorKind::Internal)
                    .with_hint(format!("unknown tab {tab:?}"))
            })?;
        self.send_command("Target.closeTarget", json!({ "targetId": target_id }))
            .await
            .map(|_| ())
    }

    async fn wait_for_load(&self, tab: TabId, timeout: Duration) -> Result<(), BridgeError> {
        let mut rx = self.bus.subscribe();

        // The load phase may have fired before the caller got here; check
        // the document state once before trusting the event stream.
        if let Ok(state) = self.evaluate(tab, "document.readyState").await {
            if state.as_str() == Some("complete") {
                return Ok(());
            }
        }

        let wait = async {
            loop {
                match rx.recv().await {
                    Ok(TabEvent::Lifecycle { tab: seen, phase, .. })
                        if seen == tab && phase == "load" =>
                    {
                        return Ok(());
                    }
                    Ok(_) => continue,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => {
                        return Err(BridgeError::new(BridgeErrorKind::CdpIo)
                            .with_hint("event bus closed before load"));
                    }
                }
            }
        };

        match tokio::time::timeout(timeout, wait).await {
            Ok(result) => result,
            Err(_) => Err(BridgeError::new(BridgeErrorKind::NavTimeout)
                .with_hint("tab did not reach load-complete in time")),
        }
    }

    async fn query_exists(&self, tab: TabId, selector: &str) -> Result<bool, BridgeError> {
        let literal = Self::selector_literal(selector)?;
        let expression = format!(
            "(() => {{\n    try {{\n        return {{ found: !!document.querySelector({literal}) }};\n    }} catch (err) {{\n        return {{ found: false }};\n    }}\n}})()"
        );
        let value = self.evaluate(tab, &expression).await?;
        Ok(value
            .get("found")
            .and_then(|v| v.as_bool())
            .unwrap_or(false))
    }

    async fn set_field_text(
        &self,
        tab: TabId,
        selector: &str,
        text: &str,
    ) -> Result<(), BridgeError> {
        let object_id = self.resolve_object_id(tab, selector).await?;

        let call_response = self
            .send_tab_command(
                tab,
                "Runtime.callFunctionOn",
                json!({
                    "objectId": object_id.clone(),
                    "functionDeclaration": SET_TEXT_FN.trim(),
                    "arguments": [ { "value": text } ],
                    "awaitPromise": true,
                    "returnByValue": true,
                }),
            )
            .await?;

        let status = call_response
            .get("result")
            .and_then(|res| res.get("value"))
            .and_then(|val| val.get("status"))
            .and_then(|val| val.as_str())
            .unwrap_or("unknown")
            .to_string();

        let _ = self
            .send_tab_command(
                tab,
                "Runtime.releaseObject",
                json!({ "objectId": object_id }),
            )
            .await;

        match status.as_str() {
            "set" => Ok(()),
            "not-found" => Err(BridgeError::new(BridgeErrorKind::TargetNotFound)
                .with_hint(format!("field vanished for selector '{selector}'"))),
            other => Err(BridgeError::new(BridgeErrorKind::Internal)
                .with_hint(format!("set_field_text returned status '{other}'"))),
        }
    }

    async fn press_enter(&self, tab: TabId) -> Result<bool, BridgeError> {
        let value = self.evaluate(tab, PRESS_ENTER_EXPR.trim()).await?;
        Ok(value
            .get("handled")
            .and_then(|v| v.as_bool())
            .unwrap_or(false))
    }

    async fn click(
        &self,
        tab: TabId,
        selector: &str,
        deadline: Duration,
    ) -> Result<(), BridgeError> {
        let literal = Self::selector_literal(selector)?;
        let expression = format!(
            "(() => {{\n    const el = document.querySelector({literal});\n    if (!el) {{ return null; }}\n    const rect = el.getBoundingClientRect();\n    return {{\n        x: Number.isFinite(rect.left) ? rect.left + rect.width / 2 : 0,\n        y: Number.isFinite(rect.top) ? rect.top + rect.height / 2 : 0\n    }};\n}})()"
        );

        let poll_interval = Duration::from_millis(100);
        let deadline_instant = Instant::now() + deadline;
        let center = loop {
            let value = self.evaluate(tab, &expression).await?;
            if let (Some(x), Some(y)) = (
                value.get("x").and_then(|v| v.as_f64()),
                value.get("y").and_then(|v| v.as_f64()),
            ) {
                break (x, y);
            }

            if Instant::now() >= deadline_instant {
                return Err(BridgeError::new(BridgeErrorKind::TargetNotFound)
                    .with_hint(format!("click target not found for selector '{selector}'")));
            }

            sleep(poll_interval).await;
        };

        for kind in ["mousePressed", "mouseReleased"] {
            self.send_tab_command(
                tab,
                "Input.dispatchMouseEvent",
                json!({
                    "type": kind,
                    "x": center.0,
                    "y": center.1,
                    "button": "left",
                    "buttons": 1,
                    "clickCount": 1,
                    "pointerType": "mouse",
                }),
            )
            .await?;
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<TabEvent> {
        self.bus.subscribe()
    }
}

fn decode<T: serde::de::DeserializeOwned>(params: Value) -> Result<T, BridgeError> {
    serde_json::from_value(params)
        .map_err(|err| BridgeError::new(BridgeErrorKind::Internal).with_hint(err.to_string()))
}

#[derive(Debug, Deserialize)]
struct TargetCreatedParams {
    #[serde(rename = "targetInfo")]
    target_info: TargetInfoPayload,
}

#[derive(Debug, Deserialize)]
struct TargetDestroyedParams {
    #[serde(rename = "targetId")]
    target_id: String,
}

#[derive(Debug, Deserialize)]
struct AttachedToTargetParams {
    #[serde(rename = "sessionId")]
    session_id: String,
    #[serde(rename = "targetInfo")]
    target_info: TargetInfoPayload,
}

#[derive(Debug, Deserialize)]
struct DetachedFromTargetParams {
    #[serde(rename = "sessionId")]
    session_id: String,
}

#[derive(Debug, Deserialize)]
struct TargetInfoChangedParams {
    #[serde(rename = "targetInfo")]
    target_info: TargetInfoPayload,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct TargetInfoPayload {
    #[serde(rename = "targetId")]
    target_id: String,
    #[serde(rename = "type")]
    target_type: String,
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PageLifecycleParams {
    name: String,
}

fn timestamp_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_else(|_| Duration::from_secs(0))
        .as_millis() as u64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::event_bus;
    use crate::scripted::ScriptedTransport;

    fn scripted_adapter(transport: Arc<ScriptedTransport>) -> Arc<TabAdapter> {
        Arc::new(TabAdapter::with_transport(
            BridgeConfig::default(),
            event_bus(64),
            transport,
            BridgeMode::Real,
        ))
    }

    #[tokio::test]
    async fn open_tab_registers_target_and_session() {
        let transport = ScriptedTransport::with_defaults();
        let adapter = scripted_adapter(Arc::clone(&transport));
        Arc::clone(&adapter).start().await.unwrap();

        let tab = adapter.open_tab("https://chatgpt.com/").await.unwrap();
        assert!(adapter.registry.get_cdp_session(&tab).is_some());
        assert_eq!(
            adapter.registry.get(&tab).unwrap().recent_url.as_deref(),
            Some("https://chatgpt.com/")
        );

        adapter.shutdown().await;
    }

    #[tokio::test]
    async fn wait_for_load_resolves_on_lifecycle_event() {
        let transport = ScriptedTransport::with_defaults();
        let adapter = scripted_adapter(Arc::clone(&transport));
        Arc::clone(&adapter).start().await.unwrap();

        let tab = adapter.open_tab("https://claude.ai/").await.unwrap();
        adapter
            .wait_for_load(tab, Duration::from_secs(2))
            .await
            .unwrap();

        adapter.shutdown().await;
    }

    #[tokio::test]
    async fn close_tab_issues_close_target() {
        let transport = ScriptedTransport::with_defaults();
        let adapter = scripted_adapter(Arc::clone(&transport));
        Arc::clone(&adapter).start().await.unwrap();

        let tab = adapter.open_tab("https://gemini.google.com/").await.unwrap();
        adapter.close_tab(tab).await.unwrap();
        assert_eq!(transport.count_method("Target.closeTarget"), 1);

        adapter.shutdown().await;
    }

    #[tokio::test]
    async fn press_enter_reports_unhandled_keypress() {
        let transport = ScriptedTransport::with_defaults();
        transport.set_enter_handled(false);
        let adapter = scripted_adapter(Arc::clone(&transport));
        Arc::clone(&adapter).start().await.unwrap();

        let tab = adapter.open_tab("https://chatgpt.com/").await.unwrap();
        adapter
            .wait_for_load(tab, Duration::from_secs(2))
            .await
            .unwrap();
        assert!(!adapter.press_enter(tab).await.unwrap());

        adapter.shutdown().await;
    }
}
