//! Neighbor topology construction.
//!
//! The topology assigns each agent a bounded, undirected neighbor set (if A
//! reads B, B reads A). It is built once at construction, rebuilt on
//! explicit scale change or `reset`, and never mutated per tick.

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::agent::AgentId;
use crate::target::TopologyShape;

/// An undirected adjacency table over agent indices (not ids — the swarm
/// maps ids to dense indices once and topology works in that index space).
#[derive(Debug, Clone)]
pub struct NeighborTopology {
    adjacency: Vec<Vec<usize>>,
}

impl NeighborTopology {
    /// Build a topology for `n` agents, with neighbor sets approximately
    /// size `k = max_neighbors`, seeded from `(swarm_seed, shape)` so reruns
    /// with the same seed reproduce the same topology.
    pub fn build(n: usize, shape: TopologyShape, max_neighbors: usize, swarm_seed: u64) -> Self {
        let mut rng = StdRng::seed_from_u64(swarm_seed ^ 0x5377_6172_6d53_796e);
        let k = max_neighbors.min(n.saturating_sub(1));

        let adjacency = match shape {
            TopologyShape::FullyConnected => fully_connected(n),
            TopologyShape::SmallWorld => small_world(n, k, 0.1, &mut rng),
            TopologyShape::DenseRandom => random_graph(n, k.max(n / 4).min(n.saturating_sub(1)), &mut rng),
            TopologyShape::SparseRandom => random_graph(n, k, &mut rng),
            TopologyShape::Ring => ring(n, k),
        };

        Self { adjacency }
    }

    pub fn neighbors_of(&self, index: usize) -> &[usize] {
        self.adjacency.get(index).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.adjacency.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }

    /// Translate index-space adjacency into `AgentId` neighbor sets, given
    /// the swarm's dense index -> id table.
    pub fn neighbor_ids(&self, index: usize, ids: &[AgentId]) -> Vec<AgentId> {
        self.neighbors_of(index).iter().map(|&i| ids[i]).collect()
    }
}

fn fully_connected(n: usize) -> Vec<Vec<usize>> {
    (0..n).map(|i| (0..n).filter(|&j| j != i).collect()).collect()
}

fn ring(n: usize, k: usize) -> Vec<Vec<usize>> {
    let half = (k / 2).max(1);
    let mut adjacency = vec![Vec::new(); n];
    for i in 0..n {
        for d in 1..=half {
            let fwd = (i + d) % n;
            let back = (i + n - d) % n;
            if fwd != i {
                adjacency[i].push(fwd);
            }
            if back != i && back != fwd {
                adjacency[i].push(back);
            }
        }
    }
    symmetrize(adjacency)
}

fn small_world(n: usize, k: usize, rewire_p: f64, rng: &mut StdRng) -> Vec<Vec<usize>> {
    let mut adjacency = ring(n, k);
    for i in 0..n {
        let edges: Vec<usize> = adjacency[i].clone();
        for j in edges {
            if rng.gen::<f64>() < rewire_p {
                if let Some(pos) = adjacency[i].iter().position(|&x| x == j) {
                    adjacency[i].remove(pos);
                }
                if let Some(pos) = adjacency[j].iter().position(|&x| x == i) {
                    adjacency[j].remove(pos);
                }
                let mut candidate = rng.gen_range(0..n);
                let mut attempts = 0;
                while (candidate == i || adjacency[i].contains(&candidate)) && attempts < n {
                    candidate = rng.gen_range(0..n);
                    attempts += 1;
                }
                if candidate != i {
                    adjacency[i].push(candidate);
                    adjacency[candidate].push(i);
                }
            }
        }
    }
    symmetrize(adjacency)
}

fn random_graph(n: usize, k: usize, rng: &mut StdRng) -> Vec<Vec<usize>> {
    let mut adjacency = vec![Vec::new(); n];
    let all: Vec<usize> = (0..n).collect();
    for i in 0..n {
        let mut pool: Vec<usize> = all.iter().copied().filter(|&j| j != i).collect();
        pool.shuffle(rng);
        for &j in pool.iter().take(k) {
            adjacency[i].push(j);
            adjacency[j].push(i);
        }
    }
    symmetrize(adjacency)
}

/// Dedup and guarantee the undirected-reading invariant holds exactly.
fn symmetrize(adjacency: Vec<Vec<usize>>) -> Vec<Vec<usize>> {
    let n = adjacency.len();
    let mut edges: HashSet<(usize, usize)> = HashSet::new();
    for (i, neighbors) in adjacency.iter().enumerate() {
        for &j in neighbors {
            if i != j {
                edges.insert((i.min(j), i.max(j)));
            }
        }
    }
    let mut out = vec![Vec::new(); n];
    for (a, b) in edges {
        out[a].push(b);
        out[b].push(a);
    }
    out
}
