//! Target registry: the only mutable shared state in the engine.
//!
//! All mutation goes through a single `RwLock` boundary; reads hand out
//! snapshot copies so callers never iterate under the lock. The health
//! monitor and the dispatcher both fan out over such snapshots, which keeps
//! concurrent registry edits from partially affecting an in-flight cycle
//! or dispatch.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use parking_lot::RwLock;
use tracing::{debug, info};

use crate::config::Config;

use super::target::{Target, TargetHealth, TargetStatus};

/// Registry misuse errors, surfaced synchronously to the caller
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("target '{0}' is already registered")]
    DuplicateName(String),

    #[error("group '{0}' already exists")]
    DuplicateGroup(String),

    #[error("unknown target '{0}'")]
    UnknownTarget(String),

    #[error("unknown group '{0}'")]
    UnknownGroup(String),
}

/// One status transition observed while publishing a health batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusChange {
    pub target: String,
    pub from: TargetStatus,
    pub to: TargetStatus,
}

/// Counts of targets per status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RegistryStats {
    pub total: usize,
    pub online: usize,
    pub offline: usize,
    pub unknown: usize,
    pub warning: usize,
}

#[derive(Default)]
struct Inner {
    targets: HashMap<String, Target>,
    groups: BTreeSet<String>,
}

/// Registry of server endpoints and their group labels
#[derive(Default)]
pub struct Registry {
    inner: RwLock<Inner>,
}

impl Registry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from startup configuration
    ///
    /// Groups are created first so that target group labels resolve.
    pub fn from_config(config: &Config) -> Result<Self, RegistryError> {
        let registry = Self::new();
        for group in &config.groups {
            registry.add_group(group)?;
        }
        for target_config in &config.targets {
            registry.add(target_config.to_target())?;
        }
        Ok(registry)
    }

    /// Register a target
    ///
    /// Fails with `DuplicateName` if the name is taken; the existing
    /// target is left untouched. Group labels are created through
    /// `add_group` only, so a target carrying an unregistered label is
    /// rejected with `UnknownGroup`.
    pub fn add(&self, target: Target) -> Result<(), RegistryError> {
        let mut inner = self.inner.write();
        if inner.targets.contains_key(&target.name) {
            return Err(RegistryError::DuplicateName(target.name));
        }
        if let Some(group) = &target.group {
            if !inner.groups.contains(group) {
                return Err(RegistryError::UnknownGroup(group.clone()));
            }
        }
        info!(target = %target.name, host = %target.descriptor.host, "Registered target");
        inner.targets.insert(target.name.clone(), target);
        Ok(())
    }

    /// Remove a target, returning it if it was registered
    pub fn remove(&self, name: &str) -> Option<Target> {
        let removed = self.inner.write().targets.remove(name);
        if removed.is_some() {
            info!(target = %name, "Removed target");
        }
        removed
    }

    /// Create a group label
    pub fn add_group(&self, name: &str) -> Result<(), RegistryError> {
        let mut inner = self.inner.write();
        if !inner.groups.insert(name.to_string()) {
            return Err(RegistryError::DuplicateGroup(name.to_string()));
        }
        Ok(())
    }

    /// Remove a group label, ungrouping its member targets
    ///
    /// Members are never removed. Returns false if the group did not exist.
    pub fn remove_group(&self, name: &str) -> bool {
        let mut inner = self.inner.write();
        if !inner.groups.remove(name) {
            return false;
        }
        for target in inner.targets.values_mut() {
            if target.group.as_deref() == Some(name) {
                target.group = None;
            }
        }
        info!(group = %name, "Removed group, members ungrouped");
        true
    }

    /// Move a target into a group (or out of any group with `None`)
    pub fn set_group(&self, name: &str, group: Option<&str>) -> Result<(), RegistryError> {
        let mut inner = self.inner.write();
        if let Some(group) = group {
            if !inner.groups.contains(group) {
                return Err(RegistryError::UnknownGroup(group.to_string()));
            }
        }
        let target = inner
            .targets
            .get_mut(name)
            .ok_or_else(|| RegistryError::UnknownTarget(name.to_string()))?;
        target.group = group.map(str::to_string);
        Ok(())
    }

    /// Snapshot of all targets, sorted by name
    pub fn list(&self) -> Vec<Target> {
        let inner = self.inner.read();
        let mut targets: Vec<Target> = inner.targets.values().cloned().collect();
        targets.sort_by(|a, b| a.name.cmp(&b.name));
        targets
    }

    /// Snapshot of the targets in one group, sorted by name
    pub fn list_by_group(&self, group: &str) -> Vec<Target> {
        let inner = self.inner.read();
        let mut targets: Vec<Target> = inner
            .targets
            .values()
            .filter(|t| t.group.as_deref() == Some(group))
            .cloned()
            .collect();
        targets.sort_by(|a, b| a.name.cmp(&b.name));
        targets
    }

    /// All group names
    pub fn group_names(&self) -> Vec<String> {
        self.inner.read().groups.iter().cloned().collect()
    }

    /// Copy of one target
    pub fn get(&self, name: &str) -> Option<Target> {
        self.inner.read().targets.get(name).cloned()
    }

    /// Resolve a set of names against a single snapshot
    ///
    /// One read lock for all names, so a concurrent add or remove cannot
    /// produce a resolution that mixes two registry states. The first
    /// unknown name fails the whole call.
    pub fn select<'a, I>(&self, names: I) -> Result<Vec<Target>, RegistryError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let inner = self.inner.read();
        names
            .into_iter()
            .map(|name| {
                inner
                    .targets
                    .get(name)
                    .cloned()
                    .ok_or_else(|| RegistryError::UnknownTarget(name.to_string()))
            })
            .collect()
    }

    /// Number of registered targets
    pub fn len(&self) -> usize {
        self.inner.read().targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.read().targets.is_empty()
    }

    /// Publish a batch of health updates atomically
    ///
    /// One write lock for the whole batch, so readers see either the
    /// previous cycle's snapshot or the new one, never a mix. Updates for
    /// targets removed mid-cycle are dropped. A `None` version keeps the
    /// previously observed version string. Returns the status transitions.
    pub fn apply_health(
        &self,
        updates: BTreeMap<String, TargetHealth>,
    ) -> Vec<StatusChange> {
        let mut changes = Vec::new();
        let mut inner = self.inner.write();
        for (name, mut health) in updates {
            let Some(target) = inner.targets.get_mut(&name) else {
                debug!(target = %name, "Dropping health update for removed target");
                continue;
            };
            if health.version.is_none() {
                health.version = target.health.version.take();
            }
            let old = target.health.status;
            if old != health.status {
                changes.push(StatusChange {
                    target: name,
                    from: old,
                    to: health.status,
                });
            }
            target.health = health;
        }
        changes
    }

    /// Counts of targets per status
    pub fn stats(&self) -> RegistryStats {
        let inner = self.inner.read();
        let mut stats = RegistryStats {
            total: inner.targets.len(),
            ..Default::default()
        };
        for target in inner.targets.values() {
            match target.health.status {
                TargetStatus::Online => stats.online += 1,
                TargetStatus::Offline => stats.offline += 1,
                TargetStatus::Unknown => stats.unknown += 1,
                TargetStatus::Warning => stats.warning += 1,
            }
        }
        stats
    }
}
