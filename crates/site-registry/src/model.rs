use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::SiteError;

/// Supported destination services, keyed on the wire by their lowercase name.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Service {
    ChatGpt,
    Claude,
    Gemini,
}

impl Service {
    pub const ALL: [Service; 3] = [Service::ChatGpt, Service::Claude, Service::Gemini];

    pub fn key(&self) -> &'static str {
        match self {
            Service::ChatGpt => "chatgpt",
            Service::Claude => "claude",
            Service::Gemini => "gemini",
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Service {
    type Err = SiteError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "chatgpt" => Ok(Service::ChatGpt),
            "claude" => Ok(Service::Claude),
            "gemini" => Ok(Service::Gemini),
            other => Err(SiteError::UnknownService(other.to_string())),
        }
    }
}

/// Everything the relay needs to know about one destination site.
#[derive(Clone, Debug)]
pub struct SiteProfile {
    pub service: Service,
    pub base_url: &'static str,
    pub input_selector: &'static str,
    pub submit_selector: &'static str,
    /// Pause between populating the field and dispatching the submit event;
    /// the destination front-end needs a re-render before it will accept one.
    pub settle_delay: Duration,
    /// Overall budget for the input/submit elements to appear after load.
    pub gate_budget: Duration,
}
