//! Target data model: one registered server endpoint and its runtime health.

use std::time::{Duration, SystemTime};

use serde::{Deserialize, Serialize};

/// How the engine authenticates against a target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    /// OS-integrated authentication, no credential needed
    #[default]
    Integrated,
    /// Username/password authentication via a credential reference
    Credentialed,
}

/// Connection descriptor for a target
///
/// Carries everything the external query executor needs to open a
/// connection. The credential field is a reference (lookup key), never
/// the secret itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetDescriptor {
    /// Host or instance address
    pub host: String,
    /// Authentication mode
    #[serde(default)]
    pub auth: AuthMode,
    /// Credential reference (required when auth is credentialed)
    #[serde(default)]
    pub credential: Option<String>,
    /// Default database to open
    #[serde(default)]
    pub database: Option<String>,
}

impl TargetDescriptor {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            auth: AuthMode::Integrated,
            credential: None,
            database: None,
        }
    }
}

/// Health status of a target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum TargetStatus {
    /// Never probed yet
    #[default]
    Unknown,
    /// Last probe round-trip succeeded
    Online,
    /// Last probe failed or timed out
    Offline,
    /// Reachable but degraded. The base prober never sets this;
    /// callers may layer their own detection (e.g. high latency) on top.
    Warning,
}

/// Mutable runtime health state of a target
///
/// Written only by the health monitor (one batched publication per cycle).
#[derive(Debug, Clone, Default, Serialize)]
pub struct TargetHealth {
    pub status: TargetStatus,
    /// Round-trip latency of the last successful probe
    pub latency: Option<Duration>,
    /// Last observed server version string
    pub version: Option<String>,
    /// Error text from the last failed probe
    pub last_error: Option<String>,
    /// When the target was last probed
    pub last_check: Option<SystemTime>,
}

impl TargetHealth {
    pub fn is_online(&self) -> bool {
        self.status == TargetStatus::Online
    }
}

/// One registered server endpoint
///
/// Identity and descriptor fields change only through explicit registry
/// edits; the health field changes only through `Registry::apply_health`.
#[derive(Debug, Clone, Serialize)]
pub struct Target {
    /// Unique name, the registry map key
    pub name: String,
    /// Connection descriptor handed to the query executor
    pub descriptor: TargetDescriptor,
    /// Optional group label
    pub group: Option<String>,
    /// Runtime health state
    pub health: TargetHealth,
}

impl Target {
    pub fn new(name: impl Into<String>, descriptor: TargetDescriptor) -> Self {
        Self {
            name: name.into(),
            descriptor,
            group: None,
            health: TargetHealth::default(),
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    pub fn status(&self) -> TargetStatus {
        self.health.status
    }
}
