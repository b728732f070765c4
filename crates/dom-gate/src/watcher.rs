use std::time::{Duration, Instant};

use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::errors::GateError;
use crate::model::{GatePass, GateSpec};
use crate::ports::ProbePort;

/// Poll until every selector in the spec matches, the attempt count runs
/// out, or the budget expires. An empty selector list passes immediately.
pub async fn await_elements(
    probe: &dyn ProbePort,
    spec: &GateSpec,
    cancel: &CancellationToken,
) -> Result<GatePass, GateError> {
    let started = Instant::now();
    let deadline = started + spec.budget;
    let mut attempts: u32 = 0;

    loop {
        if cancel.is_cancelled() {
            return Err(GateError::Cancelled);
        }

        attempts += 1;
        if all_present(probe, &spec.selectors).await? {
            let pass = GatePass {
                attempts,
                waited: started.elapsed(),
            };
            debug!(
                target: "dom-gate",
                attempts = pass.attempts,
                waited_ms = pass.waited.as_millis() as u64,
                "elements present"
            );
            return Ok(pass);
        }

        if attempts >= spec.max_attempts || Instant::now() >= deadline {
            debug!(
                target: "dom-gate",
                attempts,
                budget_ms = spec.budget.as_millis() as u64,
                "gave up waiting for elements"
            );
            return Err(GateError::Timeout {
                attempts,
                waited: started.elapsed(),
            });
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        tokio::select! {
            _ = cancel.cancelled() => return Err(GateError::Cancelled),
            _ = sleep(spec.poll_interval.min(remaining.max(Duration::from_millis(1)))) => {}
        }
    }
}

async fn all_present(probe: &dyn ProbePort, selectors: &[String]) -> Result<bool, GateError> {
    for selector in selectors {
        if !probe.exists(selector).await.map_err(GateError::Probe)? {
            return Ok(false);
        }
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;
    use handoff_core_types::RelayError;

    use super::*;

    /// Reports a selector present once `exists` has been asked about it
    /// `appear_after` times.
    struct CountingProbe {
        appear_after: u32,
        calls: AtomicU32,
    }

    impl CountingProbe {
        fn appearing_after(appear_after: u32) -> Self {
            Self {
                appear_after,
                calls: AtomicU32::new(0),
            }
        }

        fn never() -> Self {
            Self::appearing_after(u32::MAX)
        }
    }

    #[async_trait]
    impl ProbePort for CountingProbe {
        async fn exists(&self, _selector: &str) -> Result<bool, RelayError> {
            let seen = self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(seen >= self.appear_after)
        }
    }

    fn quick_spec(max_attempts: u32) -> GateSpec {
        GateSpec {
            selectors: vec!["textarea".into()],
            poll_interval: Duration::from_millis(5),
            max_attempts,
            budget: Duration::from_secs(2),
        }
    }

    #[tokio::test]
    async fn passes_immediately_when_present_at_time_zero() {
        let probe = CountingProbe::appearing_after(0);
        let pass = await_elements(&probe, &quick_spec(50), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(pass.attempts, 1);
    }

    #[tokio::test]
    async fn passes_once_elements_appear() {
        let probe = CountingProbe::appearing_after(3);
        let pass = await_elements(&probe, &quick_spec(50), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(pass.attempts, 4);
    }

    #[tokio::test]
    async fn terminates_by_attempt_bound_when_elements_never_appear() {
        let probe = CountingProbe::never();
        let err = await_elements(&probe, &quick_spec(5), &CancellationToken::new())
            .await
            .unwrap_err();
        match err {
            GateError::Timeout { attempts, .. } => assert_eq!(attempts, 5),
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn terminates_by_budget_when_attempt_bound_is_loose() {
        let probe = CountingProbe::never();
        let spec = GateSpec {
            selectors: vec!["textarea".into()],
            poll_interval: Duration::from_millis(10),
            max_attempts: u32::MAX,
            budget: Duration::from_millis(60),
        };
        let started = Instant::now();
        let err = await_elements(&probe, &spec, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, GateError::Timeout { .. }));
        // allow one poll interval of slack past the budget
        assert!(started.elapsed() < spec.budget + spec.poll_interval * 3);
    }

    #[tokio::test]
    async fn pair_requires_both_selectors() {
        struct OnlyInput;

        #[async_trait]
        impl ProbePort for OnlyInput {
            async fn exists(&self, selector: &str) -> Result<bool, RelayError> {
                Ok(selector == "textarea")
            }
        }

        let spec = GateSpec {
            poll_interval: Duration::from_millis(5),
            max_attempts: 3,
            budget: Duration::from_secs(1),
            ..GateSpec::pair("textarea", "button[data-testid=\"send-button\"]")
        };
        let err = await_elements(&OnlyInput, &spec, &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, GateError::Timeout { .. }));
    }

    #[tokio::test]
    async fn cancellation_wins_over_polling() {
        let probe = CountingProbe::never();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = await_elements(&probe, &quick_spec(50), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, GateError::Cancelled));
    }
}
