//! The oscillator agent.
//!
//! An agent holds no reference to its neighbors or its owning swarm, only
//! their [`AgentId`]s (see spec.md §9 on breaking the swarm/agent cycle).
//! `phase`, `coupling`, `influence`, `stubbornness` and `energy` are each
//! stored as an `AtomicU64` carrying an `f64` bit pattern, so peers can read
//! an agent's phase without a lock.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::phase::{blend, circular_mean, diff, wrap};
use crate::target::Target;

const ENERGY_FLOOR: f64 = 1e-3;

/// Stable opaque identifier assigned to an agent at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AgentId(pub u32);

impl std::fmt::Display for AgentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "agent-{}", self.0)
    }
}

fn load_f64(cell: &AtomicU64) -> f64 {
    f64::from_bits(cell.load(Ordering::Relaxed))
}

fn store_f64(cell: &AtomicU64, value: f64) {
    cell.store(value.to_bits(), Ordering::Relaxed);
}

/// One oscillator's mutable state.
pub struct Agent {
    id: AgentId,
    /// Intrinsic period when uncoupled. Immutable after creation.
    natural_frequency: std::time::Duration,
    phase: AtomicU64,
    coupling: AtomicU64,
    influence: AtomicU64,
    stubbornness: AtomicU64,
    energy: AtomicU64,
    neighbor_set: RwLock<Vec<AgentId>>,
    local_target: RwLock<Option<Target>>,
    energy_replenish_rate: f64,
}

impl Agent {
    /// Create an agent with the given identity and strategy-derived biases.
    ///
    /// `natural_frequency` must be strictly positive; callers that cannot
    /// guarantee this should clamp before calling (the swarm constructor
    /// does so for the whole strategy).
    pub fn new(
        id: AgentId,
        natural_frequency: std::time::Duration,
        phase: f64,
        coupling: f64,
        influence: f64,
        stubbornness: f64,
        energy_replenish_rate: f64,
    ) -> Self {
        Self {
            id,
            natural_frequency,
            phase: AtomicU64::new(wrap(phase).to_bits()),
            coupling: AtomicU64::new(coupling.clamp(0.0, 1.0).to_bits()),
            influence: AtomicU64::new(influence.clamp(0.0, 1.0).to_bits()),
            stubbornness: AtomicU64::new(stubbornness.clamp(0.0, 1.0).to_bits()),
            energy: AtomicU64::new(1.0_f64.to_bits()),
            neighbor_set: RwLock::new(Vec::new()),
            local_target: RwLock::new(None),
            energy_replenish_rate: energy_replenish_rate.clamp(0.0, 1.0),
        }
    }

    pub fn id(&self) -> AgentId {
        self.id
    }

    pub fn natural_frequency(&self) -> std::time::Duration {
        self.natural_frequency
    }

    /// Atomic load. Never blocks, never allocates.
    pub fn phase(&self) -> f64 {
        load_f64(&self.phase)
    }

    /// Atomic store of `wrap(x)`.
    pub fn set_phase(&self, x: f64) {
        store_f64(&self.phase, wrap(x));
    }

    pub fn coupling(&self) -> f64 {
        load_f64(&self.coupling)
    }

    pub fn set_coupling(&self, c: f64) {
        store_f64(&self.coupling, clamp_unit(c));
    }

    pub fn influence(&self) -> f64 {
        load_f64(&self.influence)
    }

    pub fn set_influence(&self, i: f64) {
        store_f64(&self.influence, clamp_unit(i));
    }

    pub fn stubbornness(&self) -> f64 {
        load_f64(&self.stubbornness)
    }

    pub fn set_stubbornness(&self, s: f64) {
        store_f64(&self.stubbornness, clamp_unit(s));
    }

    pub fn energy(&self) -> f64 {
        load_f64(&self.energy)
    }

    /// Atomic store, clamped to `[0, 1]`. Unlike the other setters this can
    /// reach exactly `0.0` — the `ENERGY_FLOOR` epsilon only applies to the
    /// scaling factor `update` reads, not to what's stored.
    pub fn set_energy(&self, e: f64) {
        store_f64(&self.energy, clamp_unit(e));
    }

    /// Snapshot of this agent's neighbor identifiers.
    pub fn neighbors(&self) -> Vec<AgentId> {
        self.neighbor_set.read().clone()
    }

    /// Replace the neighbor set. Called only by topology (re)build, never
    /// from the tick loop.
    pub fn set_neighbors(&self, neighbors: Vec<AgentId>) {
        *self.neighbor_set.write() = neighbors;
    }

    pub fn local_target(&self) -> Option<Target> {
        *self.local_target.read()
    }

    pub fn set_local_target(&self, target: Option<Target>) {
        *self.local_target.write() = target;
    }

    /// One tick's worth of update, per spec.md §4.B.
    ///
    /// `neighbor_phases` may be empty — the agent then only feels the
    /// global target. `w_global` is the local/global blend weight from the
    /// weighted goal manager (already clamped by that layer, clamped again
    /// here defensively). Never errors; invalid numeric input is absorbed by
    /// clamping, per spec.md §7.
    pub fn update(&self, neighbor_phases: &[f64], global_target_phase: f64, w_global: f64) {
        let phase_now = self.phase();
        let coupling = self.coupling();
        let stubbornness = self.stubbornness();
        let w_global = w_global.clamp(0.0, 1.0);

        let desired = if neighbor_phases.is_empty() {
            phase_now
        } else {
            let mean_neighbor = circular_mean(neighbor_phases);
            blend(phase_now, mean_neighbor, coupling)
        };

        let toward_global = blend(desired, global_target_phase, 1.0 - stubbornness);
        let desired = blend_linear(toward_global, desired, w_global);

        let energy = self.energy().clamp(ENERGY_FLOOR, 1.0);
        let delta = diff(desired, phase_now) * energy;
        let committed = wrap(phase_now + delta);
        self.set_phase(committed);

        let spent = delta.abs() / std::f64::consts::PI;
        let next_energy = (self.energy() - spent + self.energy_replenish_rate).clamp(0.0, 1.0);
        self.set_energy(next_energy);
    }
}

fn clamp_unit(x: f64) -> f64 {
    if x.is_nan() {
        0.0
    } else {
        x.clamp(0.0, 1.0)
    }
}

/// `toward_global` weighted by `w`, `base` weighted by `1 - w` — a linear mix
/// of two phases already on the same short arc from `base`, not a fresh
/// circular blend (avoids re-wrapping past the intended direction).
fn blend_linear(toward_global: f64, base: f64, w: f64) -> f64 {
    wrap(base + diff(toward_global, base) * w)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn agent(phase: f64) -> Agent {
        Agent::new(AgentId(0), Duration::from_millis(100), phase, 0.5, 0.5, 0.2, 0.01)
    }

    #[test]
    fn phase_roundtrips_through_atomic() {
        let a = agent(1.23);
        assert!((a.phase() - 1.23).abs() < 1e-9);
        a.set_phase(10.0);
        assert_eq!(a.phase(), wrap(10.0));
    }

    #[test]
    fn setters_clamp_to_unit_range() {
        let a = agent(0.0);
        a.set_coupling(5.0);
        assert_eq!(a.coupling(), 1.0);
        a.set_influence(-5.0);
        assert_eq!(a.influence(), 0.0);
        a.set_stubbornness(f64::NAN);
        assert_eq!(a.stubbornness(), 0.0);
    }

    #[test]
    fn update_with_no_neighbors_only_feels_global_target() {
        let a = agent(0.0);
        a.set_energy(1.0);
        a.update(&[], std::f64::consts::PI, 1.0);
        // should have moved toward PI, away from 0
        assert!(a.phase() > 0.0);
    }

    #[test]
    fn update_never_panics_on_empty_neighbors() {
        let a = agent(0.0);
        for _ in 0..50 {
            a.update(&[], 0.0, 0.0);
        }
    }

    #[test]
    fn set_energy_can_reach_zero() {
        let a = agent(0.0);
        a.set_energy(0.0);
        assert_eq!(a.energy(), 0.0);
    }

    #[test]
    fn update_still_moves_an_agent_with_zero_stored_energy() {
        let a = agent(0.0);
        a.set_energy(0.0);
        a.update(&[], std::f64::consts::PI, 1.0);
        assert!(a.phase() > 0.0, "ENERGY_FLOOR should keep the agent moving even at zero stored energy");
    }

    #[test]
    fn energy_stays_in_unit_range_after_many_updates() {
        let a = agent(0.0);
        for i in 0..200 {
            a.update(&[1.0, 2.0, 3.0], std::f64::consts::PI, 0.5);
            let e = a.energy();
            assert!((0.0..=1.0).contains(&e), "energy out of range at step {i}: {e}");
        }
    }

    #[test]
    fn neighbor_set_excludes_self_by_construction_contract() {
        let a = agent(0.0);
        a.set_neighbors(vec![AgentId(1), AgentId(2)]);
        assert_eq!(a.neighbors(), vec![AgentId(1), AgentId(2)]);
    }
}
