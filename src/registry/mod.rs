//! Target registry: registered server endpoints, group labels, health state.
//!
//! The registry is the engine's only mutable shared state. Mutations are
//! serialized behind one lock; reads hand out snapshots.

mod store;
mod target;

pub use store::{Registry, RegistryError, RegistryStats, StatusChange};
pub use target::{AuthMode, Target, TargetDescriptor, TargetHealth, TargetStatus};
