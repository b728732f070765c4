use std::time::Instant;

use async_trait::async_trait;
use tokio::time::sleep;
use tracing::{debug, instrument};

use dom_gate::{await_elements, GateError, GateSpec, ProbePort};
use handoff_core_types::RelayError;

use crate::errors::InjectError;
use crate::model::{ExecCtx, InjectParams, InjectPhase, InjectReport, SubmitPath};
use crate::policy::InjectPolicyView;
use crate::ports::{EventsPort, PagePort};

pub struct RuntimeDeps<'a> {
    pub page: &'a dyn PagePort,
    pub events: &'a dyn EventsPort,
    pub policy: &'a InjectPolicyView,
}

/// Asks the element question through the page port so the gate stays
/// transport-agnostic.
struct PageProbe<'a>(&'a dyn PagePort);

#[async_trait]
impl ProbePort for PageProbe<'_> {
    async fn exists(&self, selector: &str) -> Result<bool, RelayError> {
        self.0.field_exists(selector).await
    }
}

#[instrument(skip_all, fields(command = %ctx.command_id))]
pub async fn execute(
    ctx: &ExecCtx,
    params: InjectParams,
    deps: RuntimeDeps<'_>,
) -> Result<InjectReport, InjectError> {
    if !deps.policy.enabled {
        return Err(InjectError::Disabled);
    }
    if params.text.len() > deps.policy.max_text_len {
        return Err(InjectError::TextTooLong(deps.policy.max_text_len));
    }
    if ctx.cancel.is_cancelled() {
        return Err(InjectError::Cancelled);
    }

    let started_at = Instant::now();
    let mut report = InjectReport::new();

    enter(&mut report, deps.events, ctx, InjectPhase::WaitingForElements).await;
    let gate_spec = GateSpec::pair(params.input_selector.as_str(), params.submit_selector.as_str())
        .with_budget(params.gate_budget);
    let probe = PageProbe(deps.page);
    let pass = match await_elements(&probe, &gate_spec, &ctx.cancel).await {
        Ok(pass) => pass,
        Err(GateError::Timeout { attempts, waited }) => {
            enter(&mut report, deps.events, ctx, InjectPhase::TimedOut).await;
            deps.events.emit_finished(&ctx.command_id, false).await;
            return Err(InjectError::GateTimeout { attempts, waited });
        }
        Err(GateError::Cancelled) => return Err(InjectError::Cancelled),
        Err(GateError::Probe(err)) => return Err(InjectError::Page(err)),
    };
    report.gate_attempts = pass.attempts;
    enter(&mut report, deps.events, ctx, InjectPhase::ElementsFound).await;

    deps.page
        .set_field_text(&params.input_selector, &params.text)
        .await
        .map_err(InjectError::Page)?;
    enter(&mut report, deps.events, ctx, InjectPhase::TextSet).await;

    // Give the page's framework a re-render before submitting; dispatching
    // the keypress against a stale composer drops the payload on some sites.
    sleep(params.settle_delay).await;

    let handled = deps.page.press_enter().await.map_err(InjectError::Page)?;
    enter(&mut report, deps.events, ctx, InjectPhase::EventDispatched).await;

    if handled {
        report.submit_path = Some(SubmitPath::Event);
        enter(&mut report, deps.events, ctx, InjectPhase::SubmitViaEvent).await;
    } else {
        debug!(target: "tool-inject", command = %ctx.command_id, "enter unhandled, clicking submit");
        deps.page
            .click_submit(&params.submit_selector)
            .await
            .map_err(InjectError::Page)?;
        report.submit_path = Some(SubmitPath::Click);
        enter(&mut report, deps.events, ctx, InjectPhase::SubmitViaClick).await;
    }

    enter(&mut report, deps.events, ctx, InjectPhase::Done).await;
    report.ok = true;
    deps.events.emit_finished(&ctx.command_id, true).await;
    Ok(report.finish(started_at))
}

async fn enter(report: &mut InjectReport, events: &dyn EventsPort, ctx: &ExecCtx, phase: InjectPhase) {
    report.enter(phase);
    events.emit_phase(&ctx.command_id, phase).await;
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    use handoff_core_types::CommandId;
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::events::LogEvents;

    struct MockPage {
        field_present: bool,
        enter_handled: bool,
        set_calls: AtomicU32,
        enter_calls: AtomicU32,
        click_calls: AtomicU32,
        last_text: Mutex<Option<String>>,
    }

    impl MockPage {
        fn new(field_present: bool, enter_handled: bool) -> Self {
            Self {
                field_present,
                enter_handled,
                set_calls: AtomicU32::new(0),
                enter_calls: AtomicU32::new(0),
                click_calls: AtomicU32::new(0),
                last_text: Mutex::new(None),
            }
        }
    }

    #[async_trait]
    impl PagePort for MockPage {
        async fn field_exists(&self, _selector: &str) -> Result<bool, RelayError> {
            Ok(self.field_present)
        }

        async fn set_field_text(&self, _selector: &str, text: &str) -> Result<(), RelayError> {
            self.set_calls.fetch_add(1, Ordering::SeqCst);
            *self.last_text.lock().unwrap() = Some(text.to_string());
            Ok(())
        }

        async fn press_enter(&self) -> Result<bool, RelayError> {
            self.enter_calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.enter_handled)
        }

        async fn click_submit(&self, _selector: &str) -> Result<(), RelayError> {
            self.click_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn ctx() -> ExecCtx {
        ExecCtx::new(
            CommandId::new(),
            Instant::now() + Duration::from_secs(5),
            CancellationToken::new(),
        )
    }

    fn params() -> InjectParams {
        InjectParams {
            text: "Summarize this video".into(),
            input_selector: "textarea".into(),
            submit_selector: "button[data-testid=\"send-button\"]".into(),
            settle_delay: Duration::from_millis(5),
            gate_budget: Duration::from_millis(200),
        }
    }

    fn deps<'a>(
        page: &'a MockPage,
        events: &'a LogEvents,
        policy: &'a InjectPolicyView,
    ) -> RuntimeDeps<'a> {
        RuntimeDeps {
            page,
            events,
            policy,
        }
    }

    #[tokio::test]
    async fn full_sequence_with_handled_enter_submits_exactly_once() {
        let page = MockPage::new(true, true);
        let events = LogEvents;
        let policy = InjectPolicyView::default();

        let report = execute(&ctx(), params(), deps(&page, &events, &policy))
            .await
            .unwrap();

        assert!(report.ok);
        assert_eq!(
            report.phases,
            vec![
                InjectPhase::WaitingForElements,
                InjectPhase::ElementsFound,
                InjectPhase::TextSet,
                InjectPhase::EventDispatched,
                InjectPhase::SubmitViaEvent,
                InjectPhase::Done,
            ]
        );
        assert_eq!(report.submit_path, Some(SubmitPath::Event));
        assert_eq!(page.set_calls.load(Ordering::SeqCst), 1);
        assert_eq!(page.enter_calls.load(Ordering::SeqCst), 1);
        assert_eq!(page.click_calls.load(Ordering::SeqCst), 0);
        assert_eq!(
            page.last_text.lock().unwrap().as_deref(),
            Some("Summarize this video")
        );
    }

    #[tokio::test]
    async fn unhandled_enter_falls_back_to_exactly_one_click() {
        let page = MockPage::new(true, false);
        let events = LogEvents;
        let policy = InjectPolicyView::default();

        let report = execute(&ctx(), params(), deps(&page, &events, &policy))
            .await
            .unwrap();

        assert_eq!(report.submit_path, Some(SubmitPath::Click));
        assert!(report.phases.contains(&InjectPhase::SubmitViaClick));
        assert!(!report.phases.contains(&InjectPhase::SubmitViaEvent));
        assert_eq!(page.enter_calls.load(Ordering::SeqCst), 1);
        assert_eq!(page.click_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn missing_elements_time_out_without_touching_the_field() {
        let page = MockPage::new(false, true);
        let events = LogEvents;
        let policy = InjectPolicyView::default();
        let mut p = params();
        p.gate_budget = Duration::from_millis(50);

        let err = execute(&ctx(), p, deps(&page, &events, &policy))
            .await
            .unwrap_err();

        assert!(matches!(err, InjectError::GateTimeout { .. }));
        assert_eq!(page.set_calls.load(Ordering::SeqCst), 0);
        assert_eq!(page.enter_calls.load(Ordering::SeqCst), 0);
        assert_eq!(page.click_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn oversized_text_is_rejected_before_any_page_work() {
        let page = MockPage::new(true, true);
        let events = LogEvents;
        let policy = InjectPolicyView {
            max_text_len: 8,
            ..InjectPolicyView::default()
        };

        let err = execute(&ctx(), params(), deps(&page, &events, &policy))
            .await
            .unwrap_err();

        assert!(matches!(err, InjectError::TextTooLong(8)));
        assert_eq!(page.set_calls.load(Ordering::SeqCst), 0);
    }
}
