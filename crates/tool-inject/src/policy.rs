use std::time::Duration;

/// Static knobs for the injector.
#[derive(Clone, Debug)]
pub struct InjectPolicyView {
    pub enabled: bool,
    pub max_text_len: usize,
    /// Used when a site profile carries no settle delay of its own.
    pub default_settle_delay: Duration,
}

impl Default for InjectPolicyView {
    fn default() -> Self {
        Self {
            enabled: true,
            max_text_len: 100_000,
            default_settle_delay: Duration::from_millis(500),
        }
    }
}
