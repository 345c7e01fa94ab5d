//! Health monitoring for registered targets
//!
//! This module provides:
//! - Periodic concurrent probe cycles across all registered targets
//! - Per-target status tracking (Unknown -> Online/Offline each cycle)
//! - One broadcast snapshot per completed cycle
//! - A single-flight guard so at most one cycle is ever running

mod monitor;

pub use monitor::{HealthMonitor, HealthSnapshot};
