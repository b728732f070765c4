use serde::{Deserialize, Serialize};

use handoff_core_types::{CommandId, RelayError};

/// Incoming wire shapes. Two spellings of the same intent are accepted:
/// the command form `{"type":"COMMAND","command":"chatgpt","params":{"text":...}}`
/// and the analyze form `{"type":"ANALYZE","payload":{"text":...,"service":...}}`.
#[derive(Clone, Debug, Deserialize)]
#[serde(tag = "type")]
pub enum RelayRequest {
    #[serde(rename = "COMMAND")]
    Command {
        command: String,
        params: CommandParams,
    },
    #[serde(rename = "ANALYZE")]
    Analyze { payload: AnalyzePayload },
}

#[derive(Clone, Debug, Deserialize)]
pub struct CommandParams {
    pub text: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct AnalyzePayload {
    pub text: String,
    pub service: String,
}

/// A normalized command with its correlation id. The id travels in the
/// message itself, so concurrent commands never share any mutable slot.
#[derive(Clone, Debug)]
pub struct Command {
    pub id: CommandId,
    pub service_key: String,
    pub text: String,
}

impl Command {
    pub fn new(service_key: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: CommandId::new(),
            service_key: service_key.into(),
            text: text.into(),
        }
    }
}

impl From<RelayRequest> for Command {
    fn from(request: RelayRequest) -> Self {
        match request {
            RelayRequest::Command { command, params } => Command::new(command, params.text),
            RelayRequest::Analyze { payload } => Command::new(payload.service, payload.text),
        }
    }
}

/// Outgoing wire shapes: `{"success":true,"id":...}` or
/// `{"error":"...","id":...}`.
#[derive(Clone, Debug, Serialize)]
#[serde(untagged)]
pub enum RelayResponse {
    Success { success: bool, id: CommandId },
    Failure { error: String, id: CommandId },
}

impl RelayResponse {
    pub fn ok(id: CommandId) -> Self {
        RelayResponse::Success { success: true, id }
    }

    pub fn failure(id: CommandId, err: &RelayError) -> Self {
        RelayResponse::Failure {
            error: err.to_string(),
            id,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, RelayResponse::Success { .. })
    }

    pub fn id(&self) -> &CommandId {
        match self {
            RelayResponse::Success { id, .. } | RelayResponse::Failure { id, .. } => id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_form_parses() {
        let request: RelayRequest = serde_json::from_str(
            r#"{"type":"COMMAND","command":"chatgpt","params":{"text":"Summarize this video"}}"#,
        )
        .unwrap();
        let command = Command::from(request);
        assert_eq!(command.service_key, "chatgpt");
        assert_eq!(command.text, "Summarize this video");
    }

    #[test]
    fn analyze_form_parses() {
        let request: RelayRequest = serde_json::from_str(
            r#"{"type":"ANALYZE","payload":{"text":"hello","service":"claude"}}"#,
        )
        .unwrap();
        let command = Command::from(request);
        assert_eq!(command.service_key, "claude");
        assert_eq!(command.text, "hello");
    }

    #[test]
    fn unknown_type_is_rejected() {
        let parsed = serde_json::from_str::<RelayRequest>(r#"{"type":"PING"}"#);
        assert!(parsed.is_err());
    }

    #[test]
    fn responses_serialize_to_the_wire_shapes() {
        let id = CommandId::new();
        let ok = serde_json::to_value(RelayResponse::ok(id.clone())).unwrap();
        assert_eq!(ok["success"], true);
        assert_eq!(ok["id"], id.0);

        let err = RelayError::internal("boom");
        let failed = serde_json::to_value(RelayResponse::failure(id.clone(), &err)).unwrap();
        assert_eq!(failed["error"], "internal error: boom");
        assert!(failed.get("success").is_none());
    }

    #[test]
    fn each_request_gets_its_own_id() {
        let a = Command::new("chatgpt", "one");
        let b = Command::new("chatgpt", "two");
        assert_ne!(a.id, b.id);
    }
}
