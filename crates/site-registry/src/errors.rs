use thiserror::Error;

use handoff_core_types::{RelayError, RelayErrorKind};

#[derive(Debug, Error)]
pub enum SiteError {
    #[error("unknown service '{0}'")]
    UnknownService(String),
}

impl From<SiteError> for RelayError {
    fn from(err: SiteError) -> Self {
        RelayError::new(RelayErrorKind::UnsupportedCommand).with_hint(err.to_string())
    }
}
