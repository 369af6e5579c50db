//! Decision core for the gang-aware custom scheduler.
//!
//! The crate is deliberately cut off from the cluster: the driver serializes
//! everything the policy needs into a [`Snapshot`], and [`schedule`] returns a
//! [`Plan`] of bind and evict actions for the driver to apply. No I/O, no
//! clocks, no state between calls — identical snapshots produce identical
//! plans.

mod engine;
mod plan;
mod snapshot;

pub use engine::schedule;
pub use plan::{Action, Plan};
pub use snapshot::{NodeState, PodId, PodPhase, PodState, Snapshot};
