use serde::{Deserialize, Serialize};

/// Retry policy knobs for the Loader's transient-error backoff (§4.6,
/// recommended 3 attempts, 2s → 8s).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrySettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: usize,
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

fn default_max_attempts() -> usize {
    3
}
fn default_base_delay_ms() -> u64 {
    2_000
}
fn default_max_delay_ms() -> u64 {
    8_000
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}

/// Process-wide runtime settings (§6): batch sizing, worker parallelism,
/// retry tuning, the lock file path, and the directory backing the embedded
/// checkpoint/failure stores.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeSettings {
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
    #[serde(default)]
    pub retry: RetrySettings,
    #[serde(default = "default_lock_file_path")]
    pub lock_file_path: String,
    #[serde(default = "default_state_path")]
    pub state_path: String,
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    /// Wall-clock timeout applied to a single batch's database operations
    /// (§5). A batch that exceeds it is treated as a transient error and
    /// handed to the Loader's retry policy.
    #[serde(default = "default_batch_timeout_secs")]
    pub batch_timeout_secs: u64,
}

fn default_batch_size() -> usize {
    500
}
fn default_max_workers() -> usize {
    4
}
fn default_lock_file_path() -> String {
    "/tmp/sync-engine.lock".to_string()
}
fn default_state_path() -> String {
    "./sync-engine-state".to_string()
}
fn default_log_filter() -> String {
    "info".to_string()
}
fn default_batch_timeout_secs() -> u64 {
    60
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            max_workers: default_max_workers(),
            retry: RetrySettings::default(),
            lock_file_path: default_lock_file_path(),
            state_path: default_state_path(),
            log_filter: default_log_filter(),
            batch_timeout_secs: default_batch_timeout_secs(),
        }
    }
}
