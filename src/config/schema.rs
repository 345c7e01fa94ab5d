use std::time::Duration;

use serde::Deserialize;

use crate::registry::{AuthMode, Target, TargetDescriptor};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Health monitor configuration
    #[serde(default)]
    pub monitor: MonitorConfig,
    /// Dispatcher configuration
    #[serde(default)]
    pub dispatch: DispatchConfig,
    /// Targets registered at startup
    #[serde(default)]
    pub targets: Vec<TargetConfig>,
    /// Group labels registered at startup
    #[serde(default)]
    pub groups: Vec<String>,
}

// ============================================================================
// Health Monitor Configuration
// ============================================================================

/// Health monitor configuration
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorConfig {
    /// Whether the recurring health cycle is enabled
    #[serde(default = "default_monitor_enabled")]
    pub enabled: bool,
    /// Interval between cycles (milliseconds)
    #[serde(default = "default_check_interval_ms")]
    pub check_interval_ms: u64,
    /// Timeout for each probe (milliseconds)
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
    /// Round-trip command the prober issues. Any side-effect-free, fast
    /// command works; the first cell of the first result row is taken as
    /// the server version string.
    #[serde(default = "default_probe_command")]
    pub probe_command: String,
}

fn default_monitor_enabled() -> bool {
    true
}

fn default_check_interval_ms() -> u64 {
    5000
}

fn default_probe_timeout_ms() -> u64 {
    3000
}

fn default_probe_command() -> String {
    "SELECT VERSION()".to_string()
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            enabled: default_monitor_enabled(),
            check_interval_ms: default_check_interval_ms(),
            probe_timeout_ms: default_probe_timeout_ms(),
            probe_command: default_probe_command(),
        }
    }
}

impl MonitorConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.check_interval_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

// ============================================================================
// Dispatcher Configuration
// ============================================================================

/// Dispatcher configuration
#[derive(Debug, Clone, Deserialize)]
pub struct DispatchConfig {
    /// Per-target command timeout (milliseconds)
    #[serde(default = "default_query_timeout_ms")]
    pub query_timeout_ms: u64,
}

fn default_query_timeout_ms() -> u64 {
    30_000
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            query_timeout_ms: default_query_timeout_ms(),
        }
    }
}

impl DispatchConfig {
    pub fn query_timeout(&self) -> Duration {
        Duration::from_millis(self.query_timeout_ms)
    }
}

// ============================================================================
// Target Configuration
// ============================================================================

/// One target endpoint as declared in configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TargetConfig {
    /// Unique target name
    pub name: String,
    /// Host or instance address
    pub host: String,
    /// Authentication mode
    #[serde(default)]
    pub auth: AuthMode,
    /// Credential reference (for credentialed auth)
    #[serde(default)]
    pub credential: Option<String>,
    /// Default database
    #[serde(default)]
    pub database: Option<String>,
    /// Group label
    #[serde(default)]
    pub group: Option<String>,
}

impl TargetConfig {
    /// Convert to a registry target
    pub fn to_target(&self) -> Target {
        let mut target = Target::new(
            self.name.clone(),
            TargetDescriptor {
                host: self.host.clone(),
                auth: self.auth,
                credential: self.credential.clone(),
                database: self.database.clone(),
            },
        );
        target.group = self.group.clone();
        target
    }
}
