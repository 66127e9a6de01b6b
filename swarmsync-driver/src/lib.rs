//! The swarm driver: owns agents, drives ticks on a schedule, and tracks
//! convergence over time.
//!
//! [`swarm::Swarm`] is the orchestration layer; it is the only thing in this
//! workspace that holds `tokio`/`rayon` runtime state. [`monitor`] is the
//! ring-buffer convergence tracker it feeds each tick.

pub mod monitor;
pub mod swarm;

pub use monitor::{ConvergenceMonitor, CoherenceSample, MonitorStatistics};
pub use swarm::{DistributionSnapshot, Swarm};

pub mod prelude {
    pub use crate::monitor::{CoherenceSample, ConvergenceMonitor, MonitorStatistics};
    pub use crate::swarm::{DistributionSnapshot, Swarm};
    pub use swarmsync_core::prelude::*;
    pub use swarmsync_goals::prelude::*;
}
