//! Scripted transport for tests: answers the protocol commands the adapter
//! issues with canned payloads, replays the target/lifecycle event choreography
//! a real browser would produce, and records every command for assertions.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::{mpsc, Mutex};
use tokio::time::sleep;

use crate::error::{BridgeError, BridgeErrorKind};
use crate::transport::{CdpTransport, CommandTarget, TransportEvent};

#[derive(Clone, Debug)]
pub struct RecordedCall {
    pub method: String,
    pub params: Value,
    pub session: Option<String>,
}

pub struct ScriptedTransport {
    events_tx: mpsc::Sender<TransportEvent>,
    events_rx: Mutex<mpsc::Receiver<TransportEvent>>,
    calls: StdMutex<Vec<RecordedCall>>,
    next_target: AtomicU32,
    enter_handled: AtomicBool,
    field_present: AtomicBool,
    /// Delay between target attach and the synthetic load-complete event.
    load_delay: Duration,
}

impl ScriptedTransport {
    pub fn with_defaults() -> Arc<Self> {
        let (events_tx, events_rx) = mpsc::channel(128);
        Arc::new(Self {
            events_tx,
            events_rx: Mutex::new(events_rx),
            calls: StdMutex::new(Vec::new()),
            next_target: AtomicU32::new(1),
            enter_handled: AtomicBool::new(true),
            field_present: AtomicBool::new(true),
            load_delay: Duration::from_millis(100),
        })
    }

    /// Whether the scripted page claims to act on the synthetic Enter.
    pub fn set_enter_handled(&self, handled: bool) {
        self.enter_handled.store(handled, Ordering::SeqCst);
    }

    /// Whether the scripted page's composer elements exist at all.
    pub fn set_field_present(&self, present: bool) {
        self.field_present.store(present, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count_method(&self, method: &str) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.method == method)
            .count()
    }

    /// URLs passed to Target.createTarget, in order.
    pub fn created_urls(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.method == "Target.createTarget")
            .filter_map(|call| {
                call.params
                    .get("url")
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string())
            })
            .collect()
    }

    /// Texts delivered through Runtime.callFunctionOn, in order.
    pub fn injected_texts(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|call| call.method == "Runtime.callFunctionOn")
            .filter_map(|call| {
                call.params
                    .get("arguments")
                    .and_then(|v| v.as_array())
                    .and_then(|args| args.first())
                    .and_then(|arg| arg.get("value"))
                    .and_then(|v| v.as_str())
                    .map(|s| s.to_string())
            })
            .collect()
    }

    async fn push_event(&self, method: &str, params: Value, session: Option<String>) {
        let _ = self
            .events_tx
            .send(TransportEvent {
                method: method.to_string(),
                params,
                session_id: session,
            })
            .await;
    }

    async fn create_target(&self, params: &Value) -> Value {
        let n = self.next_target.fetch_add(1, Ordering::SeqCst);
        let target_id = format!("target-{n}");
        let session_id = format!("session-{n}");
        let url = params
            .get("url")
            .and_then(|v| v.as_str())
            .unwrap_or("about:blank")
            .to_string();

        let info = json!({
            "targetId": target_id,
            "type": "page",
            "url": url,
        });

        self.push_event(
            "Target.targetCreated",
            json!({ "targetInfo": info.clone() }),
            None,
        )
        .await;
        self.push_event(
            "Target.attachedToTarget",
            json!({ "sessionId": session_id, "targetInfo": info }),
            None,
        )
        .await;

        let events_tx = self.events_tx.clone();
        let delay = self.load_delay;
        let load_session = session_id.clone();
        tokio::spawn(async move {
            sleep(delay).await;
            let _ = events_tx
                .send(TransportEvent {
                    method: "Page.lifecycleEvent".to_string(),
                    params: json!({ "name": "load" }),
                    session_id: Some(load_session),
                })
                .await;
        });

        json!({ "targetId": target_id })
    }

    fn evaluate(&self, params: &Value) -> Value {
        let expression = params
            .get("expression")
            .and_then(|v| v.as_str())
            .unwrap_or_default();
        let field_present = self.field_present.load(Ordering::SeqCst);

        if expression.contains("readyState") {
            return json!({ "result": { "value": "loading" } });
        }
        if expression.contains("KeyboardEvent") {
            let handled = self.enter_handled.load(Ordering::SeqCst);
            return json!({ "result": { "value": { "handled": handled } } });
        }
        if expression.contains("found") {
            return json!({ "result": { "value": { "found": field_present } } });
        }
        if expression.contains("getBoundingClientRect") {
            if field_present {
                return json!({ "result": { "value": { "x": 320.0, "y": 480.0 } } });
            }
            return json!({ "result": { "value": null } });
        }
        if expression.starts_with("document.querySelector(") {
            if field_present {
                return json!({ "result": { "objectId": "scripted-object-1" } });
            }
            return json!({ "result": {} });
        }
        json!({ "result": { "value": null } })
    }
}

#[async_trait]
impl CdpTransport for ScriptedTransport {
    async fn start(&self) -> Result<(), BridgeError> {
        Ok(())
    }

    async fn next_event(&self) -> Option<TransportEvent> {
        let mut guard = self.events_rx.lock().await;
        guard.recv().await
    }

    async fn send_command(
        &self,
        target: CommandTarget,
        method: &str,
        params: Value,
    ) -> Result<Value, BridgeError> {
        let session = match target {
            CommandTarget::Browser => None,
            CommandTarget::Session(id) => Some(id),
        };
        self.calls.lock().unwrap().push(RecordedCall {
            method: method.to_string(),
            params: params.clone(),
            session,
        });

        match method {
            "Target.createTarget" => Ok(self.create_target(&params).await),
            "Target.setDiscoverTargets"
            | "Target.setAutoAttach"
            | "Target.closeTarget"
            | "Page.enable"
            | "Page.setLifecycleEventsEnabled"
            | "Input.dispatchMouseEvent"
            | "Runtime.releaseObject"
            | "Browser.getVersion" => Ok(json!({})),
            "Runtime.evaluate" => Ok(self.evaluate(&params)),
            "Runtime.callFunctionOn" => {
                if self.field_present.load(Ordering::SeqCst) {
                    Ok(json!({ "result": { "value": { "status": "set" } } }))
                } else {
                    Ok(json!({ "result": { "value": { "status": "not-found" } } }))
                }
            }
            other => Err(BridgeError::new(BridgeErrorKind::Internal)
                .with_hint(format!("scripted transport has no answer for {other}"))),
        }
    }
}
