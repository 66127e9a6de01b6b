//! The declared goal, the resolved target, and the resolved strategy.
//!
//! `Goal` is what a caller declares. `Target` is the caller-supplied "what
//! in-phase means" triple. `Strategy` is what the goal resolver (in
//! `swarmsync-goals`) computes from a `Goal` and a swarm size; it is
//! read-only once a run starts.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A declared goal an application wants the swarm to converge on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Goal {
    MinimizeApiCalls,
    DistributeLoad,
    ReachConsensus,
    MinimizeLatency,
    SaveEnergy,
    MaintainRhythm,
    RecoverFromFailure,
    AdaptToTraffic,
}

impl Goal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Goal::MinimizeApiCalls => "minimize_api_calls",
            Goal::DistributeLoad => "distribute_load",
            Goal::ReachConsensus => "reach_consensus",
            Goal::MinimizeLatency => "minimize_latency",
            Goal::SaveEnergy => "save_energy",
            Goal::MaintainRhythm => "maintain_rhythm",
            Goal::RecoverFromFailure => "recover_from_failure",
            Goal::AdaptToTraffic => "adapt_to_traffic",
        }
    }
}

/// What "in phase" means, and the target coherence the driver converges on.
///
/// Immutable once a run starts; changing the target requires constructing a
/// new swarm.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Target {
    /// Phase value, in radians, that defines "aligned" for in-phase goals.
    pub target_phase: f64,
    /// Desired oscillation period.
    pub target_frequency: Duration,
    /// Convergence threshold for the order parameter, in `[0, 1]`.
    pub target_coherence: f64,
}

impl Target {
    pub fn new(target_phase: f64, target_frequency: Duration, target_coherence: f64) -> Self {
        Self {
            target_phase: crate::phase::wrap(target_phase),
            target_frequency,
            target_coherence: target_coherence.clamp(0.0, 1.0),
        }
    }
}

/// The phase relationship a strategy steers the swarm toward.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum PhaseRelation {
    InPhase,
    AntiPhase,
    Clustered { k: usize },
    Independent,
}

/// Neighbor topology shape (see `swarmsync_core::topology`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TopologyShape {
    FullyConnected,
    SmallWorld,
    DenseRandom,
    SparseRandom,
    Ring,
}

/// A worst-case initial phase pattern used by `reset` to make recovery
/// observable (see spec.md §4.G).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorstCaseInit {
    /// Evenly spread around the circle (bad start for in-phase goals).
    EvenlySpread,
    /// All phases collapsed to zero (bad start for anti-phase goals).
    Collapsed,
    /// Every agent at a distinct, evenly-spaced-minus-one phase (consensus).
    AllDistinct,
    /// Phases at multiples of an incommensurate constant (rhythm).
    IrregularDrift,
    /// Two tight clusters at 0 and PI (recovery).
    TwoClusters,
}

/// The resolved, read-only configuration a `Goal` + swarm size produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Strategy {
    pub goal: Goal,
    pub phase_relation: PhaseRelation,
    pub topology_shape: TopologyShape,
    pub max_neighbors: usize,
    pub coupling_gain: f64,
    pub stubbornness_bias: f64,
    pub influence_bias: f64,
    pub tick_period: Duration,
    pub worst_case_init: WorstCaseInit,
    /// Per-tick energy replenishment, a strategy parameter per spec.md §9's
    /// open question rather than a hardcoded global constant.
    pub energy_replenish_rate: f64,
}

impl Strategy {
    /// `true` when the agent count falls outside the goal's advisory range.
    ///
    /// This never blocks construction; the resolver still produces a usable
    /// strategy. It is surfaced as a `tracing::warn!` by the resolver and can
    /// be recomputed by callers that want to react to it.
    pub fn is_poor_fit(&self, agent_count: usize, recommended: (usize, usize)) -> bool {
        agent_count < recommended.0 || agent_count > recommended.1
    }
}
