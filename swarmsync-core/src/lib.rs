//! Data model for goal-directed oscillator swarm synchronization.
//!
//! This crate defines the types every other layer builds on: circular phase
//! arithmetic ([`phase`]), the oscillator [`agent::Agent`], neighbor
//! [`topology`], and the [`target::Target`]/[`target::Strategy`] pair that
//! describes what a swarm is converging on and how. It holds no orchestration
//! logic — that lives in `swarmsync-goals` (resolving a goal into a strategy)
//! and `swarmsync-driver` (running the tick loop).

pub mod agent;
pub mod error;
pub mod phase;
pub mod target;
pub mod topology;

pub use agent::{Agent, AgentId};
pub use error::{SwarmError, SwarmResult};
pub use target::{Goal, PhaseRelation, Strategy, Target, TopologyShape, WorstCaseInit};
pub use topology::NeighborTopology;

/// Common imports for consumers of this crate.
pub mod prelude {
    pub use crate::agent::{Agent, AgentId};
    pub use crate::error::{SwarmError, SwarmResult};
    pub use crate::phase::{blend, diff, wrap};
    pub use crate::target::{Goal, PhaseRelation, Strategy, Target, TopologyShape, WorstCaseInit};
    pub use crate::topology::NeighborTopology;
}
