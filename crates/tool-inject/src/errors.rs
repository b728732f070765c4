use std::time::Duration;

use thiserror::Error;

use handoff_core_types::{RelayError, RelayErrorKind};

#[derive(Debug, Error)]
pub enum InjectError {
    #[error("tool disabled by policy")]
    Disabled,
    #[error("text exceeds max length ({0})")]
    TextTooLong(usize),
    #[error("elements not found after {attempts} attempts ({waited:?})")]
    GateTimeout { attempts: u32, waited: Duration },
    #[error("page operation failed: {0}")]
    Page(RelayError),
    #[error("operation cancelled")]
    Cancelled,
}

impl From<InjectError> for RelayError {
    fn from(err: InjectError) -> Self {
        match err {
            InjectError::GateTimeout { .. } => {
                RelayError::new(RelayErrorKind::ElementNotFound).with_hint(err.to_string())
            }
            InjectError::Page(inner) => inner,
            other => RelayError::internal(other.to_string()),
        }
    }
}
