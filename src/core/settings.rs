//! DF-002: Run settings: endpoints, file locations, poll budget, automation.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://api.digitalocean.com/v2";
pub const DEFAULT_RECORD_FILE: &str = "droplet_info.json";
pub const DEFAULT_SNAPSHOT_FILE: &str = "terraform.tfstate";
pub const DEFAULT_AUTOMATION_BIN: &str = "terraform";

/// Polling policy for the wait-for-IP loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollPolicy {
    /// Sleep between polls
    pub interval: Duration,

    /// Maximum number of GET requests
    pub max_attempts: u32,

    /// Upper bound on total time spent waiting
    pub deadline: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_attempts: 180,
            deadline: Duration::from_secs(900),
        }
    }
}

/// Everything a lifecycle run needs besides the DSL itself.
#[derive(Debug, Clone)]
pub struct Settings {
    pub api_url: String,
    pub record_file: PathBuf,
    pub snapshot_file: PathBuf,
    pub poll: PollPolicy,
    pub automation_bin: String,
    pub automation_timeout: Duration,
    pub skip_automation: bool,
    pub event_log: Option<PathBuf>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            record_file: PathBuf::from(DEFAULT_RECORD_FILE),
            snapshot_file: PathBuf::from(DEFAULT_SNAPSHOT_FILE),
            poll: PollPolicy::default(),
            automation_bin: DEFAULT_AUTOMATION_BIN.to_string(),
            automation_timeout: Duration::from_secs(120),
            skip_automation: false,
            event_log: None,
        }
    }
}
