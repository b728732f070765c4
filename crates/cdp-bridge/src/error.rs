use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use handoff_core_types::{RelayError, RelayErrorKind};

/// High-level error categories surfaced by the bridge.
#[derive(Clone, Debug, Error, Serialize, Deserialize)]
pub enum BridgeErrorKind {
    #[error("navigation timed out")]
    NavTimeout,
    #[error("cdp i/o failure")]
    CdpIo,
    #[error("target element not found")]
    TargetNotFound,
    #[error("internal error")]
    Internal,
}

/// Enriched error metadata passed back to higher layers.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BridgeError {
    pub kind: BridgeErrorKind,
    pub hint: Option<String>,
}

impl BridgeError {
    pub fn new(kind: BridgeErrorKind) -> Self {
        Self { kind, hint: None }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl fmt::Display for BridgeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(hint) = &self.hint {
            write!(f, ": {}", hint)?;
        }
        Ok(())
    }
}

impl std::error::Error for BridgeError {}

impl From<BridgeError> for RelayError {
    fn from(err: BridgeError) -> Self {
        let kind = match err.kind {
            BridgeErrorKind::NavTimeout => RelayErrorKind::Navigation,
            BridgeErrorKind::CdpIo => RelayErrorKind::MessageChannel,
            BridgeErrorKind::TargetNotFound => RelayErrorKind::ElementNotFound,
            BridgeErrorKind::Internal => RelayErrorKind::Internal,
        };
        let mapped = RelayError::new(kind);
        match err.hint {
            Some(hint) => mapped.with_hint(hint),
            None => mapped,
        }
    }
}
