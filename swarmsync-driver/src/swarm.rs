//! The swarm driver: owns agents, drives the tick loop, and measures
//! convergence (spec.md §4.G).

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use rand::rngs::StdRng;
use rand::seq::index::sample;
use rand::Rng;
use rand::SeedableRng;
use rayon::prelude::*;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use swarmsync_core::phase::{circular_mean, wrap};
use swarmsync_core::{
    Agent, AgentId, Goal, NeighborTopology, PhaseRelation, Strategy, SwarmError, SwarmResult, Target,
    WorstCaseInit,
};
use swarmsync_goals::{blend_targets, coherence as estimate_coherence, histogram, resolve};

use crate::monitor::ConvergenceMonitor;

/// Safety timeout after which a disruption's recovery watchdog gives up and
/// clears the flag regardless of measured coherence.
const DISRUPTION_SAFETY_TIMEOUT: Duration = Duration::from_secs(60);

struct DisruptionState {
    active: bool,
    deadline: Instant,
}

/// A running (or pausable, or resettable) swarm of oscillator agents.
///
/// Agents are stored densely by index; `id_to_index` is built once at
/// construction and treated as read-only for the swarm's lifetime (per
/// spec.md §5, rebuilding it requires quiescing the tick loop, which this
/// type does not currently expose — scale change is out of scope).
pub struct Swarm {
    agents: Vec<Agent>,
    ids: Vec<AgentId>,
    id_to_index: HashMap<AgentId, usize>,
    topology: NeighborTopology,
    strategy: Strategy,
    target: RwLock<Target>,
    monitor: ConvergenceMonitor,
    seed: u64,
    tick_count: AtomicU64,
    paused: AtomicBool,
    resume_notify: Notify,
    frozen_coherence: RwLock<Option<f64>>,
    disruption: RwLock<DisruptionState>,
    /// Built once here; every `tick`/`tick_once`/`run` call reuses it rather
    /// than paying thread-pool setup cost per tick (spec.md §4.G, §5).
    pool: rayon::ThreadPool,
}

/// A phase histogram plus a single-number read on how well the swarm is
/// honoring a non-in-phase `PhaseRelation`, for goals where raw `R` isn't the
/// quality metric (spec.md §4.F). `None` for `PhaseRelation::InPhase` and
/// `Independent`, where `R` itself is already the right signal.
#[derive(Debug, Clone)]
pub struct DistributionSnapshot {
    pub histogram: Vec<usize>,
    pub quality: f64,
}

impl Swarm {
    /// Construct a swarm of `count` agents resolving `goal` into a strategy,
    /// converging on `target`.
    pub fn new(count: i64, goal: Goal, target: Target) -> SwarmResult<Swarm> {
        if count <= 0 {
            return Err(SwarmError::InvalidCount(count));
        }
        if !(0.0..=1.0).contains(&target.target_coherence) {
            return Err(SwarmError::InvalidTarget(format!(
                "target_coherence {} outside [0, 1]",
                target.target_coherence
            )));
        }
        if target.target_frequency.is_zero() {
            return Err(SwarmError::InvalidTarget("target_frequency must be positive".into()));
        }

        let count = count as usize;
        let strategy = resolve(goal, count);
        validate_strategy(&strategy, count)?;
        let seed = derive_seed(count, goal, &target);

        let ids: Vec<AgentId> = (0..count).map(|i| AgentId(i as u32)).collect();
        let id_to_index: HashMap<AgentId, usize> =
            ids.iter().enumerate().map(|(i, &id)| (id, i)).collect();

        let topology = NeighborTopology::build(count, strategy.topology_shape, strategy.max_neighbors, seed);

        // Construction starts agents at random phases (spec.md §2's control
        // flow); the worst-case patterns in `worst_case_phase` are reserved
        // for `reset()`, which deliberately re-seeds a known-bad starting
        // distribution to make recovery observable.
        let mut rng = StdRng::seed_from_u64(seed ^ 0xA6E1_9E9D_4B3F_1A7D);
        let agents: Vec<Agent> = ids
            .iter()
            .map(|&id| {
                let initial_phase = rng.gen_range(0.0..std::f64::consts::TAU);
                Agent::new(
                    id,
                    strategy.tick_period.max(Duration::from_millis(1)),
                    initial_phase,
                    strategy.coupling_gain,
                    strategy.influence_bias,
                    strategy.stubbornness_bias,
                    strategy.energy_replenish_rate,
                )
            })
            .collect();

        for (index, agent) in agents.iter().enumerate() {
            agent.set_neighbors(topology.neighbor_ids(index, &ids));
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(rayon::current_num_threads().max(1))
            .build()
            .map_err(|e| SwarmError::AllocationFailure(format!("failed to build tick thread pool: {e}")))?;

        info!(
            agents = count,
            goal = strategy.goal.as_str(),
            topology = ?strategy.topology_shape,
            seed,
            "swarm constructed"
        );

        Ok(Swarm {
            agents,
            ids,
            id_to_index,
            topology,
            strategy,
            target: RwLock::new(target),
            monitor: ConvergenceMonitor::new(target.target_coherence, Duration::from_millis(100)),
            seed,
            tick_count: AtomicU64::new(0),
            paused: AtomicBool::new(false),
            resume_notify: Notify::new(),
            frozen_coherence: RwLock::new(None),
            disruption: RwLock::new(DisruptionState { active: false, deadline: Instant::now() }),
            pool,
        })
    }

    /// Run the tick loop until `cancel` is triggered. Returns normally on
    /// cancellation; that is not an error.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(agents = self.agents.len(), goal = self.strategy.goal.as_str(), "run: starting tick loop");

        loop {
            if cancel.is_cancelled() {
                info!(ticks = self.tick_count.load(Ordering::Relaxed), "run: stopping tick loop");
                return;
            }

            if self.paused.load(Ordering::Acquire) {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!("run: cancellation observed while paused");
                        return;
                    }
                    _ = self.resume_notify.notified() => {}
                }
                continue;
            }

            let tick_start = Instant::now();
            self.tick(&self.pool);
            self.tick_count.fetch_add(1, Ordering::Relaxed);

            let elapsed = tick_start.elapsed();
            let remaining = self.strategy.tick_period.saturating_sub(elapsed);
            if remaining.is_zero() {
                tokio::task::yield_now().await;
            } else {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        debug!("run: cancellation observed during tick sleep");
                        return;
                    }
                    _ = tokio::time::sleep(remaining) => {}
                }
            }
        }
    }

    /// Run exactly one tick synchronously, outside the `run` loop. Intended
    /// for tests and demos that want deterministic step-by-step control
    /// rather than `tick_period`-paced execution.
    pub fn tick_once(&self) {
        self.tick(&self.pool);
        self.tick_count.fetch_add(1, Ordering::Relaxed);
    }

    fn tick(&self, pool: &rayon::ThreadPool) {
        let global = *self.target.read();
        let strategy = &self.strategy;

        pool.install(|| {
            self.agents.par_iter().enumerate().for_each(|(index, agent)| {
                let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                    let neighbor_phases: Vec<f64> = self
                        .topology
                        .neighbors_of(index)
                        .iter()
                        .map(|&j| self.agents[j].phase())
                        .collect();

                    let w = agent.influence();

                    match strategy.phase_relation {
                        PhaseRelation::InPhase => {
                            let effective_phase = match agent.local_target() {
                                Some(local) => blend_targets(&local, &global, w).target_phase,
                                None => global.target_phase,
                            };
                            agent.update(&neighbor_phases, effective_phase, w);
                        }
                        PhaseRelation::Independent => {
                            // Frequency-locked, phase secondary: neighbors
                            // still couple the tick rhythm, but the swarm-wide
                            // target phase never pulls on this agent.
                            agent.update(&neighbor_phases, global.target_phase, 0.0);
                        }
                        PhaseRelation::AntiPhase => {
                            // Repel from the local neighborhood's mean phase
                            // instead of chasing it, the negative-coupling
                            // mechanism that produces a splay (spread) state
                            // rather than synchrony.
                            let anti_target = if neighbor_phases.is_empty() {
                                agent.phase()
                            } else {
                                wrap(circular_mean(&neighbor_phases) + std::f64::consts::PI)
                            };
                            agent.update(&[], anti_target, 1.0);
                        }
                        PhaseRelation::Clustered { k } => {
                            // Pull toward whichever of the k evenly-spaced
                            // anchors is nearest, so agents self-sort into k
                            // clusters instead of one.
                            let anchor = nearest_cluster_phase(agent.phase(), k.max(1));
                            agent.update(&[], anchor, 1.0);
                        }
                    }
                }));

                if let Err(panic) = outcome {
                    error!(agent = %agent.id(), ?panic, "agent update panicked, tick continues");
                }
            });
        });

        let r = self.measure_coherence();
        self.monitor.record(r);
        self.update_disruption_watchdog(r);
        if let Some(snapshot) = self.measure_distribution() {
            debug!(
                tick = self.tick_count.load(Ordering::Relaxed),
                histogram = ?snapshot.histogram,
                quality = snapshot.quality,
                "distribution snapshot"
            );
        }
        debug!(tick = self.tick_count.load(Ordering::Relaxed), coherence = r, "tick complete");
    }

    fn update_disruption_watchdog(&self, r: f64) {
        let mut state = self.disruption.write();
        if !state.active {
            return;
        }
        let target_coherence = self.target.read().target_coherence;
        if r >= target_coherence || Instant::now() >= state.deadline {
            state.active = false;
        }
    }

    /// Suspend the tick loop. The in-flight tick finishes first; phases and
    /// the last coherence sample are frozen for observers.
    pub fn pause(&self) {
        self.paused.store(true, Ordering::Release);
        let mut frozen = self.frozen_coherence.write();
        *frozen = Some(self.monitor.current_coherence());
        info!("swarm paused");
    }

    /// Resume a paused tick loop. A no-op if not paused.
    pub fn resume(&self) {
        self.paused.store(false, Ordering::Release);
        *self.frozen_coherence.write() = None;
        self.resume_notify.notify_waiters();
        info!("swarm resumed");
    }

    /// Reset every agent to the strategy's worst-case initial phase, clear
    /// the monitor, and restart the tick counter. The topology is not
    /// rebuilt.
    pub fn reset(&self) {
        let mut rng = StdRng::seed_from_u64(self.seed ^ 0xA6E1_9E9D_4B3F_1A7D);
        for agent in &self.agents {
            let phase = worst_case_phase(self.strategy.worst_case_init, agent.id().0 as usize, self.agents.len(), &mut rng);
            agent.set_phase(phase);
            agent.set_energy(1.0);
        }
        self.monitor.reset();
        self.tick_count.store(0, Ordering::Relaxed);
        info!(pattern = ?self.strategy.worst_case_init, "swarm reset to worst-case pattern");
        self.disruption.write().active = false;
    }

    /// Perturb `floor(fraction * N)` uniformly-chosen agents by `+ pi`, and
    /// start a recovery watchdog that the tick loop clears once coherence
    /// returns above target (or after a safety timeout).
    pub fn disrupt(&self, fraction: f64) {
        let fraction = fraction.clamp(0.0, 1.0);
        let n = self.agents.len();
        let count = ((fraction * n as f64).floor() as usize).min(n);
        if count == 0 {
            return;
        }

        let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(self.tick_count.load(Ordering::Relaxed)));
        for index in sample(&mut rng, n, count).iter() {
            let agent = &self.agents[index];
            agent.set_phase(agent.phase() + std::f64::consts::PI);
        }

        *self.disruption.write() = DisruptionState {
            active: true,
            deadline: Instant::now() + DISRUPTION_SAFETY_TIMEOUT,
        };
        warn!(fraction, agents_disrupted = count, "swarm disrupted");
    }

    /// `true` while a disruption's recovery watchdog has not yet cleared.
    pub fn is_disrupted(&self) -> bool {
        self.disruption.read().active
    }

    /// One estimator pass over current phases (the frozen snapshot if
    /// paused, the live phases otherwise).
    pub fn measure_coherence(&self) -> f64 {
        if let Some(frozen) = *self.frozen_coherence.read() {
            return frozen;
        }
        let phases: Vec<f64> = self.agents.iter().map(|a| a.phase()).collect();
        estimate_coherence(&phases)
    }

    /// Phase histogram and distribution quality for goals where raw `R`
    /// isn't the right convergence signal (spec.md §4.F): `None` for
    /// `InPhase`/`Independent`, where `measure_coherence` already says what's
    /// needed. Bin count is 4 for `AntiPhase` (matching spec.md §8's S2
    /// scenario) and `k` for `Clustered { k }`.
    pub fn measure_distribution(&self) -> Option<DistributionSnapshot> {
        let bins = match self.strategy.phase_relation {
            PhaseRelation::AntiPhase => 4,
            PhaseRelation::Clustered { k } => k.max(1),
            PhaseRelation::InPhase | PhaseRelation::Independent => return None,
        };

        let phases: Vec<f64> = self.agents.iter().map(|a| a.phase()).collect();
        let bucket_counts = histogram(&phases, bins);

        let quality = match self.strategy.phase_relation {
            PhaseRelation::AntiPhase => 1.0 - self.measure_coherence(),
            PhaseRelation::Clustered { .. } => {
                let total: usize = bucket_counts.iter().sum();
                if total == 0 {
                    0.0
                } else {
                    *bucket_counts.iter().max().unwrap_or(&0) as f64 / total as f64
                }
            }
            PhaseRelation::InPhase | PhaseRelation::Independent => unreachable!("filtered out above"),
        };

        Some(DistributionSnapshot { histogram: bucket_counts, quality })
    }

    /// `true` when the monitor's most recent sample is `>= target`.
    pub fn is_converged(&self) -> bool {
        self.monitor.is_converged()
    }

    pub fn monitor(&self) -> &ConvergenceMonitor {
        &self.monitor
    }

    pub fn strategy(&self) -> &Strategy {
        &self.strategy
    }

    pub fn target(&self) -> Target {
        *self.target.read()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count.load(Ordering::Relaxed)
    }

    /// Iterate over every agent as `(id, handle)`, for external observers.
    pub fn agents(&self) -> impl Iterator<Item = (AgentId, &Agent)> {
        self.ids.iter().copied().zip(self.agents.iter())
    }

    /// Look up a single agent by id.
    pub fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.id_to_index.get(&id).map(|&i| &self.agents[i])
    }
}

/// Reject hard invariant violations, warn on soft ones. The resolver always
/// produces values within range; this guards against a future resolver
/// change that breaks that contract rather than at today's call sites.
fn validate_strategy(strategy: &Strategy, agent_count: usize) -> SwarmResult<()> {
    if strategy.max_neighbors == 0 && agent_count > 1 {
        return Err(SwarmError::AllocationFailure(
            "strategy has zero max_neighbors for a multi-agent swarm".into(),
        ));
    }
    if strategy.max_neighbors >= agent_count.max(1) * 4 {
        warn!(
            max_neighbors = strategy.max_neighbors,
            agent_count, "max_neighbors is unusually large relative to swarm size"
        );
    }
    Ok(())
}

fn derive_seed(count: usize, goal: Goal, target: &Target) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    let mut mix = |x: u64| {
        hash ^= x;
        hash = hash.wrapping_mul(0x1000_0000_01b3);
    };
    mix(count as u64);
    mix(goal.as_str().len() as u64);
    mix(target.target_phase.to_bits());
    mix(target.target_coherence.to_bits());
    mix(target.target_frequency.as_nanos() as u64);
    hash
}

/// Strategy-specific worst-case initial phase for agent `index` of `n`,
/// per spec.md §4.G.
fn worst_case_phase(pattern: WorstCaseInit, index: usize, n: usize, rng: &mut StdRng) -> f64 {
    let n = n.max(1);
    match pattern {
        WorstCaseInit::EvenlySpread => std::f64::consts::TAU * index as f64 / n as f64,
        WorstCaseInit::Collapsed => 0.0,
        WorstCaseInit::AllDistinct => std::f64::consts::TAU * index as f64 / (n as f64 + 1.0),
        WorstCaseInit::IrregularDrift => {
            const INCOMMENSURATE: f64 = std::f64::consts::E;
            (index as f64) * INCOMMENSURATE
        }
        WorstCaseInit::TwoClusters => {
            let jitter = rng.gen_range(-0.01..0.01);
            if index % 2 == 0 {
                jitter
            } else {
                std::f64::consts::PI + jitter
            }
        }
    }
}

/// The nearest of `k` evenly-spaced anchor phases to `phase`, for
/// `PhaseRelation::Clustered`.
fn nearest_cluster_phase(phase: f64, k: usize) -> f64 {
    let k = k.max(1);
    let step = std::f64::consts::TAU / k as f64;
    let index = (wrap(phase) / step).round() as usize % k;
    index as f64 * step
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn target() -> Target {
        Target::new(0.0, Duration::from_millis(20), 0.85)
    }

    #[test]
    fn rejects_non_positive_count() {
        let err = Swarm::new(0, Goal::MinimizeApiCalls, target()).unwrap_err();
        assert!(matches!(err, SwarmError::InvalidCount(0)));
    }

    #[test]
    fn rejects_invalid_target_coherence() {
        // Target::new clamps on construction, so build the invalid value by
        // hand to exercise Swarm::new's own defensive check.
        let bad = Target { target_coherence: 1.5, ..target() };
        let err = Swarm::new(10, Goal::MinimizeApiCalls, bad).unwrap_err();
        assert!(matches!(err, SwarmError::InvalidTarget(_)));
    }

    #[test]
    fn rejects_zero_frequency() {
        let mut bad = target();
        bad.target_frequency = Duration::ZERO;
        let err = Swarm::new(10, Goal::MinimizeApiCalls, bad).unwrap_err();
        assert!(matches!(err, SwarmError::InvalidTarget(_)));
    }

    #[test]
    fn new_builds_the_requested_number_of_agents() {
        let swarm = Swarm::new(20, Goal::MinimizeApiCalls, target()).unwrap();
        assert_eq!(swarm.agents().count(), 20);
    }

    #[test]
    fn reset_restores_worst_case_pattern_and_clears_monitor() {
        let swarm = Swarm::new(20, Goal::MinimizeApiCalls, target()).unwrap();
        swarm.monitor.record(0.9);
        swarm.reset();
        assert_eq!(swarm.monitor.history().len(), 0);
        assert_eq!(swarm.tick_count(), 0);
    }

    #[test]
    fn disrupt_flips_the_requested_fraction_and_sets_the_flag() {
        let swarm = Swarm::new(20, Goal::MinimizeApiCalls, target()).unwrap();
        for (_, agent) in swarm.agents() {
            agent.set_phase(0.0);
        }
        swarm.disrupt(0.5);
        assert!(swarm.is_disrupted());
        let flipped = swarm.agents().filter(|(_, a)| (a.phase() - std::f64::consts::PI).abs() < 0.1).count();
        assert_eq!(flipped, 10);
    }

    #[test]
    fn disrupt_with_zero_fraction_is_a_no_op() {
        let swarm = Swarm::new(20, Goal::MinimizeApiCalls, target()).unwrap();
        swarm.disrupt(0.0);
        assert!(!swarm.is_disrupted());
    }

    #[test]
    fn pause_freezes_measured_coherence() {
        let swarm = Swarm::new(20, Goal::MinimizeApiCalls, target()).unwrap();
        for (_, agent) in swarm.agents() {
            agent.set_phase(0.0);
        }
        let before = swarm.measure_coherence();
        swarm.pause();
        for (_, agent) in swarm.agents() {
            agent.set_phase(1.0);
        }
        assert_eq!(swarm.measure_coherence(), before);
        swarm.resume();
        assert!((swarm.measure_coherence() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn construction_uses_random_phases_not_the_worst_case_pattern() {
        // DistributeLoad's worst_case_init is Collapsed (every phase 0.0);
        // construction must not use it, or anti-phase goals would start
        // with no spread to work from.
        let swarm = Swarm::new(30, Goal::DistributeLoad, target()).unwrap();
        let distinct = swarm.agents().filter(|(_, a)| a.phase().abs() > 1e-6).count();
        assert!(distinct > 1, "expected construction to draw random initial phases, all were ~0.0");
    }

    #[test]
    fn anti_phase_strategy_drives_agents_away_from_each_other() {
        let goal = Goal::DistributeLoad;
        let swarm = Swarm::new(40, goal, target()).unwrap();
        for _ in 0..1500 {
            swarm.tick_once();
        }
        assert!(swarm.measure_coherence() < 0.5, "anti-phase strategy should not converge to in-phase behavior");
    }

    #[test]
    fn measure_distribution_is_none_for_in_phase_and_some_for_anti_phase() {
        let in_phase = Swarm::new(10, Goal::MinimizeApiCalls, target()).unwrap();
        assert!(in_phase.measure_distribution().is_none());

        let anti_phase = Swarm::new(10, Goal::DistributeLoad, target()).unwrap();
        assert!(anti_phase.measure_distribution().is_some());
    }

    #[test]
    fn nearest_cluster_phase_snaps_to_the_closest_anchor() {
        assert_eq!(nearest_cluster_phase(0.1, 2), 0.0);
        assert_eq!(nearest_cluster_phase(std::f64::consts::PI - 0.1, 2), std::f64::consts::PI);
    }

    #[test]
    fn same_construction_parameters_reproduce_the_same_topology() {
        let a = Swarm::new(30, Goal::ReachConsensus, target()).unwrap();
        let b = Swarm::new(30, Goal::ReachConsensus, target()).unwrap();
        for i in 0..a.agents.len() {
            assert_eq!(a.topology.neighbors_of(i), b.topology.neighbors_of(i));
        }
    }
}
