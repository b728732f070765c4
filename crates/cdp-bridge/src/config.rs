use std::{
    env,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::detect_chrome_executable;

/// Configuration for launching and tuning the bridge.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BridgeConfig {
    pub executable: PathBuf,
    pub user_data_dir: PathBuf,
    pub headless: bool,
    pub default_deadline_ms: u64,
    /// Attach to an already-running browser instead of launching one.
    pub websocket_url: Option<String>,
    pub heartbeat_interval_ms: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            executable: default_chrome_path(),
            user_data_dir: default_profile_dir(),
            headless: resolve_headless_default(),
            default_deadline_ms: 30_000,
            websocket_url: None,
            heartbeat_interval_ms: 15_000,
        }
    }
}

fn resolve_headless_default() -> bool {
    // HANDOFF_HEADLESS: "0", "false", "no", "off" means headful
    match env::var("HANDOFF_HEADLESS") {
        Ok(value) => {
            let lower = value.to_ascii_lowercase();
            !matches!(lower.as_str(), "0" | "false" | "no" | "off")
        }
        Err(_) => true,
    }
}

fn default_chrome_path() -> PathBuf {
    detect_chrome_executable().unwrap_or_default()
}

fn default_profile_dir() -> PathBuf {
    if let Ok(path) = env::var("HANDOFF_CHROME_PROFILE") {
        return PathBuf::from(path);
    }

    Path::new("./.handoff-profile").into()
}
