use std::time::Duration;

/// What to wait for and how long to keep trying.
#[derive(Clone, Debug)]
pub struct GateSpec {
    /// All selectors must be present in the same tick for the gate to pass.
    pub selectors: Vec<String>,
    pub poll_interval: Duration,
    pub max_attempts: u32,
    /// Wall-clock ceiling, observed independently of the attempt count.
    pub budget: Duration,
}

impl GateSpec {
    pub fn new(selectors: Vec<String>) -> Self {
        Self {
            selectors,
            ..Self::default()
        }
    }

    pub fn pair(input: impl Into<String>, submit: impl Into<String>) -> Self {
        Self::new(vec![input.into(), submit.into()])
    }

    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = budget;
        self
    }
}

impl Default for GateSpec {
    fn default() -> Self {
        Self {
            selectors: Vec::new(),
            poll_interval: Duration::from_millis(100),
            max_attempts: 50,
            budget: Duration::from_secs(5),
        }
    }
}

/// Evidence the gate passed, for logs and reports.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct GatePass {
    pub attempts: u32,
    pub waited: Duration,
}
