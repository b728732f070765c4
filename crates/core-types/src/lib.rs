use std::fmt;

use thiserror::Error;
use uuid::Uuid;

/// Correlation id minted once per accepted command and carried through
/// every message, response, and log line for that command.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq, Hash)]
pub struct CommandId(pub String);

impl CommandId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for CommandId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// High-level failure categories shared across the workspace.
///
/// `EventNotHandled` exists for completeness: the injector recovers from it
/// locally via the click fallback and callers never observe it.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum RelayErrorKind {
    #[error("navigation failed")]
    Navigation,
    #[error("element not found")]
    ElementNotFound,
    #[error("synthetic event not handled")]
    EventNotHandled,
    #[error("unsupported command")]
    UnsupportedCommand,
    #[error("message channel closed")]
    MessageChannel,
    #[error("internal error")]
    Internal,
}

/// Workspace error type: a category plus an optional free-form hint.
#[cfg_attr(feature = "serde-full", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug)]
pub struct RelayError {
    pub kind: RelayErrorKind,
    pub hint: Option<String>,
}

impl RelayError {
    pub fn new(kind: RelayErrorKind) -> Self {
        Self { kind, hint: None }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    pub fn navigation(hint: impl Into<String>) -> Self {
        Self::new(RelayErrorKind::Navigation).with_hint(hint)
    }

    pub fn internal(hint: impl Into<String>) -> Self {
        Self::new(RelayErrorKind::Internal).with_hint(hint)
    }
}

impl fmt::Display for RelayError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(hint) = &self.hint {
            write!(f, ": {}", hint)?;
        }
        Ok(())
    }
}

impl std::error::Error for RelayError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_ids_are_unique() {
        assert_ne!(CommandId::new(), CommandId::new());
    }

    #[test]
    fn error_display_includes_hint() {
        let err = RelayError::new(RelayErrorKind::Navigation).with_hint("tab failed to open");
        assert_eq!(err.to_string(), "navigation failed: tab failed to open");
        assert_eq!(
            RelayError::new(RelayErrorKind::UnsupportedCommand).to_string(),
            "unsupported command"
        );
    }
}
