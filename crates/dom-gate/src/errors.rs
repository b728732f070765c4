use std::time::Duration;

use thiserror::Error;

use handoff_core_types::{RelayError, RelayErrorKind};

#[derive(Debug, Error)]
pub enum GateError {
    #[error("elements not found after {attempts} attempts ({waited:?})")]
    Timeout { attempts: u32, waited: Duration },
    #[error("wait cancelled")]
    Cancelled,
    #[error("probe failed: {0}")]
    Probe(RelayError),
}

impl From<GateError> for RelayError {
    fn from(err: GateError) -> Self {
        match err {
            GateError::Timeout { .. } => {
                RelayError::new(RelayErrorKind::ElementNotFound).with_hint(err.to_string())
            }
            GateError::Cancelled => RelayError::internal("element wait cancelled"),
            GateError::Probe(inner) => inner,
        }
    }
}
