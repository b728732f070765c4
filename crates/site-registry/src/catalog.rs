use std::str::FromStr;
use std::time::Duration;

use crate::errors::SiteError;
use crate::model::{Service, SiteProfile};

/// The generic selector pair observed on chatgpt.com. Claude and Gemini get
/// the same pair as catalog data until their markup earns dedicated entries.
const INPUT_SELECTOR: &str = "textarea";
const SUBMIT_SELECTOR: &str = "button[data-testid=\"send-button\"]";

const SETTLE_DELAY: Duration = Duration::from_millis(500);
const GATE_BUDGET: Duration = Duration::from_secs(5);

/// Fixed service -> profile mapping.
#[derive(Clone, Debug)]
pub struct SiteCatalog {
    profiles: Vec<SiteProfile>,
}

impl SiteCatalog {
    pub fn builtin() -> Self {
        let profiles = vec![
            SiteProfile {
                service: Service::ChatGpt,
                base_url: "https://chatgpt.com/",
                input_selector: INPUT_SELECTOR,
                submit_selector: SUBMIT_SELECTOR,
                settle_delay: SETTLE_DELAY,
                gate_budget: GATE_BUDGET,
            },
            SiteProfile {
                service: Service::Claude,
                base_url: "https://claude.ai/",
                input_selector: INPUT_SELECTOR,
                submit_selector: SUBMIT_SELECTOR,
                settle_delay: SETTLE_DELAY,
                gate_budget: GATE_BUDGET,
            },
            SiteProfile {
                service: Service::Gemini,
                base_url: "https://gemini.google.com/",
                input_selector: INPUT_SELECTOR,
                submit_selector: SUBMIT_SELECTOR,
                settle_delay: SETTLE_DELAY,
                gate_budget: GATE_BUDGET,
            },
        ];
        Self { profiles }
    }

    pub fn lookup(&self, service: Service) -> &SiteProfile {
        self.profiles
            .iter()
            .find(|profile| profile.service == service)
            .expect("builtin catalog covers every Service variant")
    }

    /// Resolve a wire key ("chatgpt", "claude", "gemini"); unknown keys are
    /// an error and must not lead to any navigation.
    pub fn lookup_key(&self, key: &str) -> Result<&SiteProfile, SiteError> {
        let service = Service::from_str(key)?;
        Ok(self.lookup(service))
    }

    pub fn profiles(&self) -> &[SiteProfile] {
        &self.profiles
    }
}

impl Default for SiteCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_service_resolves_to_its_base_url() {
        let catalog = SiteCatalog::builtin();
        assert_eq!(
            catalog.lookup(Service::ChatGpt).base_url,
            "https://chatgpt.com/"
        );
        assert_eq!(catalog.lookup(Service::Claude).base_url, "https://claude.ai/");
        assert_eq!(
            catalog.lookup(Service::Gemini).base_url,
            "https://gemini.google.com/"
        );
    }

    #[test]
    fn base_urls_parse() {
        for profile in SiteCatalog::builtin().profiles() {
            url::Url::parse(profile.base_url).expect("catalog url must be valid");
        }
    }

    #[test]
    fn wire_keys_round_trip() {
        let catalog = SiteCatalog::builtin();
        for service in Service::ALL {
            let profile = catalog.lookup_key(service.key()).unwrap();
            assert_eq!(profile.service, service);
        }
    }

    #[test]
    fn unknown_key_is_rejected() {
        let catalog = SiteCatalog::builtin();
        let err = catalog.lookup_key("copilot").unwrap_err();
        assert!(matches!(err, SiteError::UnknownService(ref key) if key == "copilot"));
    }

    #[test]
    fn keys_are_case_insensitive() {
        let catalog = SiteCatalog::builtin();
        assert_eq!(
            catalog.lookup_key("ChatGPT").unwrap().service,
            Service::ChatGpt
        );
    }
}
