//! Query dispatch: concurrent fan-out with per-target failure isolation
//!
//! A dispatched request produces exactly one outcome per requested target,
//! whatever mix of successes, failures and cancellations occurs, and the
//! aggregate presents them in lexicographic target-name order.

mod dispatcher;
mod outcome;

pub use dispatcher::{DispatchError, Dispatcher, QueryRequest};
pub use outcome::{AggregatedResult, OutcomeKind, Summary, TargetOutcome};
