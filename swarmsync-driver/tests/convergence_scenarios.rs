//! Integration tests for the concrete scenarios in spec.md §8.

use std::time::Duration;

use swarmsync_core::Goal;
use swarmsync_driver::Swarm;
use swarmsync_goals::{histogram, recommended_target};

/// S1 — in-phase convergence: N=20, minimize_api_calls, target_coherence
/// 0.85. After at most 2000 ticks, R >= 0.85.
#[test]
fn s1_in_phase_convergence() {
    let goal = Goal::MinimizeApiCalls;
    let target = recommended_target(goal, 20, Duration::from_millis(20));
    let swarm = Swarm::new(20, goal, target).unwrap();

    let mut converged = false;
    for _ in 0..2000 {
        swarm.tick_once();
        if swarm.measure_coherence() >= 0.85 {
            converged = true;
            break;
        }
    }

    assert!(converged, "swarm failed to reach R >= 0.85 within 2000 ticks");
    assert!(swarm.measure_coherence() >= 0.85);
}

/// S2 — anti-phase distribution: N=50, distribute_load, target_coherence
/// 0.2. After convergence R <= 0.25 and the 4-bin histogram is reasonably
/// even (std-dev across bins < 0.25 * N).
#[test]
fn s2_anti_phase_distribution() {
    let goal = Goal::DistributeLoad;
    let target = recommended_target(goal, 50, Duration::from_millis(50));
    let swarm = Swarm::new(50, goal, target).unwrap();

    for _ in 0..3000 {
        swarm.tick_once();
    }

    let r = swarm.measure_coherence();
    assert!(r <= 0.25, "expected distributed (low-coherence) phases, got R = {r}");

    let phases: Vec<f64> = swarm.agents().map(|(_, a)| a.phase()).collect();
    let bins = histogram(&phases, 4);
    let n = phases.len() as f64;
    let mean = bins.iter().sum::<usize>() as f64 / bins.len() as f64;
    let variance = bins.iter().map(|&b| (b as f64 - mean).powi(2)).sum::<f64>() / bins.len() as f64;
    let std_dev = variance.sqrt();
    assert!(std_dev < 0.25 * n, "histogram too uneven: {bins:?} (std_dev = {std_dev})");
}

/// S5 — disruption recovery: N=20, minimize_api_calls, threshold=0.8.
/// Converge, disrupt by 0.2, recover to R >= 0.75 within 3x the initial
/// convergence tick count.
#[test]
fn s5_disruption_recovery() {
    let goal = Goal::MinimizeApiCalls;
    let target = recommended_target(goal, 20, Duration::from_millis(20));
    let target = swarmsync_core::Target::new(target.target_phase, target.target_frequency, 0.8);
    let swarm = Swarm::new(20, goal, target).unwrap();

    let mut initial_convergence_ticks = None;
    for tick in 0..2000 {
        swarm.tick_once();
        if swarm.measure_coherence() >= 0.8 {
            initial_convergence_ticks = Some(tick + 1);
            break;
        }
    }
    let initial_ticks = initial_convergence_ticks.expect("swarm did not converge before disruption");

    let before_disruption = swarm.measure_coherence();
    swarm.disrupt(0.2);
    assert!(
        swarm.measure_coherence() < before_disruption,
        "disruption should immediately lower coherence"
    );

    let recovery_budget = initial_ticks * 3;
    let mut recovered = false;
    for _ in 0..recovery_budget {
        swarm.tick_once();
        if swarm.measure_coherence() >= 0.75 {
            recovered = true;
            break;
        }
    }

    assert!(recovered, "swarm failed to recover within {recovery_budget} ticks");
}

/// Property 10 — disruption strictly decreases coherence on a converged
/// swarm, for any f > 0.
#[test]
fn disruption_strictly_decreases_coherence_on_a_converged_swarm() {
    let goal = Goal::MinimizeApiCalls;
    let target = recommended_target(goal, 20, Duration::from_millis(20));
    let swarm = Swarm::new(20, goal, target).unwrap();

    for _ in 0..2000 {
        swarm.tick_once();
        if swarm.is_converged() {
            break;
        }
    }
    assert!(swarm.is_converged(), "setup failed: swarm never converged");

    let before = swarm.measure_coherence();
    swarm.disrupt(0.3);
    let after = swarm.measure_coherence();

    assert!(after < before, "disrupt(0.3) did not decrease coherence: {before} -> {after}");
}
