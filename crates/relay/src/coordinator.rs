use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use handoff_core_types::{RelayError, RelayErrorKind};
use site_registry::SiteCatalog;
use tool_inject::{ExecCtx, InjectParams, InjectReport};

use crate::model::{Command, RelayRequest, RelayResponse};
use crate::ports::{InjectPort, TabPort};

/// Default ceiling for a destination page to reach load-complete.
const LOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Overall deadline for one command, covering load wait, gate, and submit.
const COMMAND_DEADLINE: Duration = Duration::from_secs(60);

pub struct Relay {
    catalog: SiteCatalog,
    tabs: Arc<dyn TabPort>,
    injector: Arc<dyn InjectPort>,
    load_timeout: Duration,
}

impl Relay {
    pub fn new(catalog: SiteCatalog, tabs: Arc<dyn TabPort>, injector: Arc<dyn InjectPort>) -> Self {
        Self {
            catalog,
            tabs,
            injector,
            load_timeout: LOAD_TIMEOUT,
        }
    }

    pub fn with_load_timeout(mut self, timeout: Duration) -> Self {
        self.load_timeout = timeout;
        self
    }

    /// Run one command to completion and report the outcome. Failures are
    /// terminal for this command only: they become an error response, never
    /// a retry.
    pub async fn handle(&self, request: RelayRequest) -> RelayResponse {
        self.handle_command(Command::from(request)).await
    }

    pub async fn handle_command(&self, command: Command) -> RelayResponse {
        let id = command.id.clone();
        match self.run(command).await {
            Ok(report) => {
                info!(
                    target: "relay",
                    command = %id,
                    submit_path = ?report.submit_path,
                    latency_ms = report.latency_ms as u64,
                    "command completed"
                );
                RelayResponse::ok(id)
            }
            Err(err) => {
                warn!(target: "relay", command = %id, error = %err, "command failed");
                RelayResponse::failure(id, &err)
            }
        }
    }

    /// Accept a command and let it run detached; a second command arriving
    /// before this one finishes gets its own tab and its own sequence.
    pub fn handle_detached(self: &Arc<Self>, request: RelayRequest) -> JoinHandle<RelayResponse> {
        let relay = Arc::clone(self);
        tokio::spawn(async move { relay.handle(request).await })
    }

    #[instrument(skip_all, fields(command = %command.id, service = %command.service_key))]
    async fn run(&self, command: Command) -> Result<InjectReport, RelayError> {
        // Unknown keys never reach the browser.
        let profile = self.catalog.lookup_key(&command.service_key)?.clone();

        let tab = self.tabs.open(profile.base_url).await.map_err(|err| {
            RelayError::new(RelayErrorKind::Navigation).with_hint(err.to_string())
        })?;
        info!(target: "relay", command = %command.id, url = profile.base_url, "tab opened");

        self.tabs.await_load(tab, self.load_timeout).await?;

        let ctx = ExecCtx::new(
            command.id.clone(),
            Instant::now() + COMMAND_DEADLINE,
            CancellationToken::new(),
        );
        let params = InjectParams {
            text: command.text,
            input_selector: profile.input_selector.to_string(),
            submit_selector: profile.submit_selector.to_string(),
            settle_delay: profile.settle_delay,
            gate_budget: profile.gate_budget,
        };

        // Exactly one injection attempt per opened tab; on failure the tab
        // stays open with the field unfilled, which is the accepted degraded
        // outcome.
        self.injector.inject(tab, ctx, params).await
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use cdp_bridge::ids::TabId;
    use tool_inject::{InjectPhase, SubmitPath};

    use super::*;

    #[derive(Default)]
    struct MockTabs {
        opened: Mutex<Vec<(TabId, String)>>,
        load_delay: Option<Duration>,
        fail_open: bool,
    }

    impl MockTabs {
        fn opened_urls(&self) -> Vec<String> {
            self.opened
                .lock()
                .unwrap()
                .iter()
                .map(|(_, url)| url.clone())
                .collect()
        }
    }

    #[async_trait]
    impl TabPort for MockTabs {
        async fn open(&self, url: &str) -> Result<TabId, RelayError> {
            if self.fail_open {
                return Err(RelayError::navigation("tab failed to open"));
            }
            let tab = TabId::new();
            self.opened.lock().unwrap().push((tab, url.to_string()));
            Ok(tab)
        }

        async fn await_load(&self, _tab: TabId, _timeout: Duration) -> Result<(), RelayError> {
            if let Some(delay) = self.load_delay {
                tokio::time::sleep(delay).await;
            }
            Ok(())
        }
    }

    #[derive(Default)]
    struct MockInjector {
        calls: Mutex<Vec<(TabId, String)>>,
        count: AtomicU32,
    }

    #[async_trait]
    impl InjectPort for MockInjector {
        async fn inject(
            &self,
            tab: TabId,
            _ctx: ExecCtx,
            params: InjectParams,
        ) -> Result<InjectReport, RelayError> {
            self.count.fetch_add(1, Ordering::SeqCst);
            self.calls.lock().unwrap().push((tab, params.text));
            Ok(InjectReport {
                ok: true,
                phases: vec![InjectPhase::Done],
                submit_path: Some(SubmitPath::Event),
                gate_attempts: 1,
                latency_ms: 1,
            })
        }
    }

    fn relay_with(tabs: Arc<MockTabs>, injector: Arc<MockInjector>) -> Relay {
        Relay::new(SiteCatalog::builtin(), tabs, injector)
    }

    fn command_request(service: &str, text: &str) -> RelayRequest {
        serde_json::from_value(serde_json::json!({
            "type": "COMMAND",
            "command": service,
            "params": { "text": text },
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn supported_key_opens_one_tab_and_injects_once() {
        let tabs = Arc::new(MockTabs::default());
        let injector = Arc::new(MockInjector::default());
        let relay = relay_with(Arc::clone(&tabs), Arc::clone(&injector));

        let response = relay
            .handle(command_request("chatgpt", "Summarize this video"))
            .await;

        assert!(response.is_success());
        assert_eq!(tabs.opened_urls(), vec!["https://chatgpt.com/"]);
        assert_eq!(injector.count.load(Ordering::SeqCst), 1);
        assert_eq!(
            injector.calls.lock().unwrap()[0].1,
            "Summarize this video"
        );
    }

    #[tokio::test]
    async fn every_supported_key_navigates_to_its_base_url() {
        for (key, url) in [
            ("chatgpt", "https://chatgpt.com/"),
            ("claude", "https://claude.ai/"),
            ("gemini", "https://gemini.google.com/"),
        ] {
            let tabs = Arc::new(MockTabs::default());
            let injector = Arc::new(MockInjector::default());
            let relay = relay_with(Arc::clone(&tabs), Arc::clone(&injector));

            let response = relay.handle(command_request(key, "hello")).await;
            assert!(response.is_success());
            assert_eq!(tabs.opened_urls(), vec![url.to_string()]);
            assert_eq!(injector.count.load(Ordering::SeqCst), 1);
        }
    }

    #[tokio::test]
    async fn unsupported_key_returns_error_without_opening_a_tab() {
        let tabs = Arc::new(MockTabs::default());
        let injector = Arc::new(MockInjector::default());
        let relay = relay_with(Arc::clone(&tabs), Arc::clone(&injector));

        let response = relay.handle(command_request("copilot", "hello")).await;

        assert!(!response.is_success());
        assert!(tabs.opened_urls().is_empty());
        assert_eq!(injector.count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn open_failure_is_reported_and_nothing_else_happens() {
        let tabs = Arc::new(MockTabs {
            fail_open: true,
            ..MockTabs::default()
        });
        let injector = Arc::new(MockInjector::default());
        let relay = relay_with(Arc::clone(&tabs), Arc::clone(&injector));

        let response = relay.handle(command_request("chatgpt", "hello")).await;

        assert!(!response.is_success());
        assert_eq!(injector.count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn back_to_back_commands_run_independently() {
        let tabs = Arc::new(MockTabs {
            load_delay: Some(Duration::from_millis(50)),
            ..MockTabs::default()
        });
        let injector = Arc::new(MockInjector::default());
        let relay = Arc::new(relay_with(Arc::clone(&tabs), Arc::clone(&injector)));

        // second command issued before the first tab finishes loading
        let first = relay.handle_detached(command_request("chatgpt", "first"));
        let second = relay.handle_detached(command_request("chatgpt", "second"));

        let (first, second) = (first.await.unwrap(), second.await.unwrap());
        assert!(first.is_success() && second.is_success());
        assert_ne!(first.id(), second.id());

        // two tabs, each with exactly one injection and its own payload
        let opened = tabs.opened.lock().unwrap();
        assert_eq!(opened.len(), 2);
        let calls = injector.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        let mut texts: Vec<&str> = calls.iter().map(|(_, text)| text.as_str()).collect();
        texts.sort_unstable();
        assert_eq!(texts, vec!["first", "second"]);
        let tabs_injected: Vec<TabId> = calls.iter().map(|(tab, _)| *tab).collect();
        assert_ne!(tabs_injected[0], tabs_injected[1]);
    }
}
