use std::sync::Arc;

use async_trait::async_trait;

use handoff_core_types::RelayError;

use crate::errors::InjectError;
use crate::events::LogEvents;
use crate::model::{ExecCtx, InjectParams, InjectReport};
use crate::policy::InjectPolicyView;
use crate::ports::{EventsPort, PagePort};
use crate::runner::{execute, RuntimeDeps};

#[async_trait]
pub trait InjectTool: Send + Sync {
    async fn run(&self, ctx: ExecCtx, params: InjectParams) -> Result<InjectReport, RelayError>;
}

pub struct InjectToolBuilder {
    policy: InjectPolicyView,
    page: Option<Arc<dyn PagePort>>,
    events: Option<Arc<dyn EventsPort>>,
}

impl InjectToolBuilder {
    pub fn new(policy: InjectPolicyView) -> Self {
        Self {
            policy,
            page: None,
            events: None,
        }
    }

    pub fn with_page(mut self, port: Arc<dyn PagePort>) -> Self {
        self.page = Some(port);
        self
    }

    pub fn with_events(mut self, port: Arc<dyn EventsPort>) -> Self {
        self.events = Some(port);
        self
    }

    pub fn build(self) -> Arc<dyn InjectTool> {
        Arc::new(InjectToolImpl {
            policy: self.policy,
            page: self.page.expect("page port is required"),
            events: self.events.unwrap_or_else(|| Arc::new(LogEvents)),
        })
    }
}

struct InjectToolImpl {
    policy: InjectPolicyView,
    page: Arc<dyn PagePort>,
    events: Arc<dyn EventsPort>,
}

#[async_trait]
impl InjectTool for InjectToolImpl {
    async fn run(&self, ctx: ExecCtx, params: InjectParams) -> Result<InjectReport, RelayError> {
        if ctx.cancel.is_cancelled() {
            return Err(InjectError::Cancelled.into());
        }
        let deps = RuntimeDeps {
            page: self.page.as_ref(),
            events: self.events.as_ref(),
            policy: &self.policy,
        };
        execute(&ctx, params, deps).await.map_err(Into::into)
    }
}
