//! Goal resolution: turns a declared [`Goal`] and a swarm size into a
//! [`Strategy`], per the condensed table in spec.md §4.D.
//!
//! Implementers may tune the numerics but must preserve the relationships in
//! the table; this resolver does. "Poor fit" is advisory only — the
//! resolver always produces a usable strategy, it just warns.

use std::time::Duration;

use swarmsync_core::{Goal, PhaseRelation, Strategy, Target, TopologyShape, WorstCaseInit};
use tracing::warn;

/// A goal's advisory swarm-size range, for the "poor fit" warning.
fn recommended_range(goal: Goal) -> (usize, usize) {
    match goal {
        Goal::MinimizeApiCalls => (10, 500),
        Goal::DistributeLoad => (10, 1000),
        Goal::ReachConsensus => (5, 200),
        Goal::MinimizeLatency => (5, 100),
        Goal::SaveEnergy => (10, 2000),
        Goal::MaintainRhythm => (5, 200),
        Goal::RecoverFromFailure => (10, 500),
        Goal::AdaptToTraffic => (10, 1000),
    }
}

/// Linear interpolation of a "high at small N, lower at large N" coherence
/// target, clamped at the sample endpoints used in spec.md's table.
fn lerp_coherence(agent_count: usize, (n_lo, c_hi): (usize, f64), (n_hi, c_lo): (usize, f64)) -> f64 {
    let n = agent_count as f64;
    if n <= n_lo as f64 {
        return c_hi;
    }
    if n >= n_hi as f64 {
        return c_lo;
    }
    let t = (n - n_lo as f64) / (n_hi as f64 - n_lo as f64);
    c_hi + (c_lo - c_hi) * t
}

/// Recommended target coherence for a goal at a given swarm size, per the
/// table in spec.md §4.D. This is advisory: the swarm's actual convergence
/// threshold is whatever `Target` the caller passes to `Swarm::new`.
pub fn recommended_coherence(goal: Goal, agent_count: usize) -> f64 {
    match goal {
        Goal::MinimizeApiCalls => lerp_coherence(agent_count, (20, 0.90), (200, 0.75)),
        Goal::DistributeLoad => 0.2,
        Goal::ReachConsensus => 0.6,
        Goal::MinimizeLatency => 0.85,
        Goal::SaveEnergy => 0.4,
        Goal::MaintainRhythm => 0.85,
        Goal::RecoverFromFailure => 0.2,
        Goal::AdaptToTraffic => 0.6,
    }
}

/// A ready-to-use `Target` built from the goal's recommendations. Callers
/// that want different numbers construct their own `Target` directly.
pub fn recommended_target(goal: Goal, agent_count: usize, target_frequency: Duration) -> Target {
    let phase = match goal {
        Goal::DistributeLoad | Goal::RecoverFromFailure => std::f64::consts::PI,
        _ => 0.0,
    };
    Target::new(phase, target_frequency, recommended_coherence(goal, agent_count))
}

/// Resolve a declared goal and swarm size into a strategy.
///
/// Always succeeds; logs a `warn!` when `agent_count` falls outside the
/// goal's advisory range (consumers can re-check with
/// [`Strategy::is_poor_fit`]).
pub fn resolve(goal: Goal, agent_count: usize) -> Strategy {
    let strategy = match goal {
        Goal::MinimizeApiCalls => Strategy {
            goal,
            phase_relation: PhaseRelation::InPhase,
            topology_shape: if agent_count <= 20 {
                TopologyShape::FullyConnected
            } else {
                TopologyShape::SmallWorld
            },
            max_neighbors: 10,
            coupling_gain: 0.6,
            stubbornness_bias: 0.2,
            influence_bias: 0.6,
            tick_period: Duration::from_millis(20),
            worst_case_init: WorstCaseInit::EvenlySpread,
            energy_replenish_rate: 0.05,
        },
        Goal::DistributeLoad => Strategy {
            goal,
            phase_relation: PhaseRelation::AntiPhase,
            topology_shape: TopologyShape::SmallWorld,
            max_neighbors: 8,
            coupling_gain: 0.5,
            stubbornness_bias: 0.3,
            influence_bias: 0.5,
            tick_period: Duration::from_millis(50),
            worst_case_init: WorstCaseInit::Collapsed,
            energy_replenish_rate: 0.03,
        },
        Goal::ReachConsensus => Strategy {
            goal,
            phase_relation: PhaseRelation::Clustered { k: 3 },
            topology_shape: TopologyShape::DenseRandom,
            max_neighbors: 16,
            coupling_gain: 0.4,
            stubbornness_bias: 0.35,
            influence_bias: 0.5,
            tick_period: Duration::from_millis(50),
            worst_case_init: WorstCaseInit::AllDistinct,
            energy_replenish_rate: 0.03,
        },
        Goal::MinimizeLatency => Strategy {
            goal,
            phase_relation: PhaseRelation::InPhase,
            topology_shape: TopologyShape::Ring,
            max_neighbors: 4,
            coupling_gain: 0.8,
            stubbornness_bias: 0.1,
            influence_bias: 0.7,
            tick_period: Duration::from_millis(5),
            worst_case_init: WorstCaseInit::EvenlySpread,
            energy_replenish_rate: 0.08,
        },
        Goal::SaveEnergy => Strategy {
            goal,
            phase_relation: PhaseRelation::InPhase,
            topology_shape: TopologyShape::SparseRandom,
            max_neighbors: 2,
            coupling_gain: 0.2,
            stubbornness_bias: 0.5,
            influence_bias: 0.3,
            tick_period: Duration::from_millis(200),
            worst_case_init: WorstCaseInit::EvenlySpread,
            energy_replenish_rate: 0.01,
        },
        Goal::MaintainRhythm => Strategy {
            goal,
            phase_relation: PhaseRelation::Independent,
            topology_shape: TopologyShape::Ring,
            max_neighbors: 4,
            coupling_gain: 0.5,
            stubbornness_bias: 0.25,
            influence_bias: 0.5,
            tick_period: target_period_for_rhythm(),
            worst_case_init: WorstCaseInit::IrregularDrift,
            energy_replenish_rate: 0.04,
        },
        Goal::RecoverFromFailure => Strategy {
            goal,
            phase_relation: PhaseRelation::AntiPhase,
            topology_shape: TopologyShape::DenseRandom,
            max_neighbors: 16,
            coupling_gain: 0.5,
            stubbornness_bias: 0.3,
            influence_bias: 0.5,
            tick_period: Duration::from_millis(50),
            worst_case_init: WorstCaseInit::TwoClusters,
            energy_replenish_rate: 0.05,
        },
        Goal::AdaptToTraffic => Strategy {
            goal,
            phase_relation: PhaseRelation::Clustered { k: 3 },
            topology_shape: TopologyShape::DenseRandom,
            max_neighbors: 10,
            coupling_gain: 0.45,
            stubbornness_bias: 0.3,
            influence_bias: 0.5,
            tick_period: Duration::from_millis(50),
            worst_case_init: WorstCaseInit::AllDistinct,
            energy_replenish_rate: 0.04,
        },
    };

    let range = recommended_range(goal);
    if strategy.is_poor_fit(agent_count, range) {
        warn!(
            goal = goal.as_str(),
            agent_count,
            recommended_min = range.0,
            recommended_max = range.1,
            "goal/swarm-size combination is a poor fit"
        );
    }

    strategy
}

/// `maintain_rhythm`'s tick period is the target period itself; the actual
/// value is filled in by the caller-supplied `Target.target_frequency` once
/// the swarm is constructed, this is just a sane default for direct callers
/// of `resolve`.
fn target_period_for_rhythm() -> Duration {
    Duration::from_millis(100)
}
