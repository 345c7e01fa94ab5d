//! Multi-target query dispatch and health-monitoring engine.
//!
//! Register any number of independent database server endpoints, keep
//! their health assessed by a background monitor, and run a single query
//! against a chosen subset of them concurrently, collecting per-target
//! results and failures without one target's failure affecting others.
//!
//! The engine is a protocol consumer: the embedding application supplies
//! a [`executor::QueryExecutor`] that knows how to talk to each target,
//! and receives aggregated results and per-cycle health snapshots back.
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use tokio_util::sync::CancellationToken;
//! use hydra::dispatch::{Dispatcher, QueryRequest};
//! use hydra::health::HealthMonitor;
//! use hydra::registry::Registry;
//!
//! # async fn run(executor: Arc<dyn hydra::executor::QueryExecutor>) -> Result<(), Box<dyn std::error::Error>> {
//! let config = hydra::config::load_config("hydra.toml")?;
//! let registry = Arc::new(Registry::from_config(&config)?);
//!
//! let monitor = Arc::new(HealthMonitor::new(
//!     Arc::clone(&registry),
//!     Arc::clone(&executor),
//!     config.monitor.clone(),
//! ));
//! monitor.start(config.monitor.interval());
//!
//! let dispatcher = Dispatcher::new(registry, executor, config.dispatch.clone());
//! let request = QueryRequest::new("SELECT 1", ["alpha", "beta"]);
//! let result = dispatcher.dispatch(&request, &CancellationToken::new()).await?;
//! println!("{:?}", result.summary());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod dispatch;
pub mod executor;
pub mod health;
pub mod metrics;
pub mod probe;
pub mod registry;
