use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main configuration structure for Rolekeeper
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Convergence engine defaults
    #[serde(default)]
    pub engine: EngineConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Audit trail configuration
    #[serde(default)]
    pub audit: AuditConfig,

    /// Guild settings used to seed the in-memory configuration store
    #[serde(default)]
    pub guilds: Vec<GuildConfig>,
}

/// What a run does with a member update that does not show the desired state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MismatchPolicy {
    /// Any member update for the key ends the run.
    #[default]
    Terminate,
    /// Mismatching updates are noise; keep retrying until a match, the
    /// budget, or the deadline.
    Ignore,
}

/// Convergence engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct EngineConfig {
    /// Delay between mutation attempts in milliseconds
    #[serde(default = "default_period_ms")]
    pub default_period_ms: u64,

    /// Overall run deadline in milliseconds
    #[serde(default = "default_timeout_ms")]
    pub default_timeout_ms: u64,

    /// Attempts allowed when a request does not say
    #[serde(default = "default_max_tries")]
    pub default_max_tries: u32,

    /// Handling of member updates that do not confirm the change
    #[serde(default)]
    pub mismatch_policy: MismatchPolicy,

    /// Buffer size of the finished-run report broadcast
    #[serde(default = "default_report_channel_capacity")]
    pub report_channel_capacity: usize,
}

const fn default_period_ms() -> u64 {
    5_000
}

const fn default_timeout_ms() -> u64 {
    30_000
}

const fn default_max_tries() -> u32 {
    5
}

const fn default_report_channel_capacity() -> usize {
    64
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_period_ms: default_period_ms(),
            default_timeout_ms: default_timeout_ms(),
            default_max_tries: default_max_tries(),
            mismatch_policy: MismatchPolicy::default(),
            report_channel_capacity: default_report_channel_capacity(),
        }
    }
}

impl EngineConfig {
    pub const fn default_period(&self) -> Duration {
        Duration::from_millis(self.default_period_ms)
    }

    pub const fn default_timeout(&self) -> Duration {
        Duration::from_millis(self.default_timeout_ms)
    }

    pub const fn with_mismatch_policy(mut self, policy: MismatchPolicy) -> Self {
        self.mismatch_policy = policy;
        self
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log format: json or pretty
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Directory for rolling log files; stdout only when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_dir: Option<String>,

    /// Rotation for file output: daily, hourly, never
    #[serde(default = "default_rotation")]
    pub rotation: String,

    /// Also log to stdout when a log directory is set
    #[serde(default = "default_true")]
    pub enable_stdout: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

fn default_rotation() -> String {
    "daily".to_string()
}

const fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
            log_dir: None,
            rotation: default_rotation(),
            enable_stdout: true,
        }
    }
}

/// Audit trail configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct AuditConfig {
    /// JSON-lines file receiving audit records; tracing only when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_path: Option<String>,
}

/// Settings for one guild
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct GuildConfig {
    /// Guild identifier
    pub id: String,

    /// Role granted to members
    pub member_role_id: String,

    /// Channel receiving audit records
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audit_channel_id: Option<String>,
}
