//! The coherence estimator: the Kuramoto order parameter magnitude
//! `R = |mean(e^{i*phase})|` over a set of live agent phases (spec.md §4.F).

use num_complex::Complex64;

/// Compute the order parameter magnitude for a slice of phases.
///
/// `R in [0, 1]`; `R = 1` for identical phases, `R ~= 0` for a uniform
/// spread. Single pass, two scalar accumulators, no heap allocation — the
/// hot-path constraint spec.md §4.F requires.
pub fn coherence(phases: &[f64]) -> f64 {
    if phases.is_empty() {
        return 0.0;
    }
    let (mut sin_sum, mut cos_sum) = (0.0, 0.0);
    for &p in phases {
        sin_sum += p.sin();
        cos_sum += p.cos();
    }
    let n = phases.len() as f64;
    let mean = Complex64::new(cos_sum / n, sin_sum / n);
    mean.norm().clamp(0.0, 1.0)
}

/// Bin phases into `k` equal-width buckets around the circle, for
/// clustered/anti-phase goals where raw `R` is not the quality metric
/// (spec.md §4.F). Consumers compute "distribution quality" from this.
pub fn histogram(phases: &[f64], k: usize) -> Vec<usize> {
    if k == 0 {
        return Vec::new();
    }
    let mut bins = vec![0usize; k];
    let width = std::f64::consts::TAU / k as f64;
    for &p in phases {
        let wrapped = swarmsync_core::phase::wrap(p);
        let bin = ((wrapped / width) as usize).min(k - 1);
        bins[bin] += 1;
    }
    bins
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::TAU;

    #[test]
    fn identical_phases_give_full_coherence() {
        let phases = vec![1.0; 10];
        assert!((coherence(&phases) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn empty_slice_gives_zero() {
        assert_eq!(coherence(&[]), 0.0);
    }

    #[test]
    fn evenly_spaced_phases_give_near_zero_coherence() {
        let n = 8;
        let phases: Vec<f64> = (0..n).map(|i| TAU * i as f64 / n as f64).collect();
        assert!(coherence(&phases) < 1.0 / n as f64 + 1e-6);
    }

    #[test]
    fn coherence_always_in_unit_range() {
        let phases = vec![0.1, 3.0, -1.5, 7.2, 0.0];
        let r = coherence(&phases);
        assert!((0.0..=1.0).contains(&r));
    }

    #[test]
    fn histogram_counts_all_phases() {
        let phases = vec![0.1, 1.7, 3.2, 4.8, 6.0];
        let bins = histogram(&phases, 4);
        assert_eq!(bins.iter().sum::<usize>(), phases.len());
    }
}
