use crate::error::SimulationError;
use crate::graph::Graph;
use crate::rng::TrialRng;
use crate::stress::EffectiveParams;
use crate::{F, NodeId};
use serde::{Deserialize, Serialize};

/// How an edge's propagation probability and the target node's intrinsic
/// susceptibility combine into the per-round failure probability.
///
/// `EdgeOnly` treats the effective edge weight as the final probability and
/// reproduces the reference results; `EdgeTimesSusceptibility` additionally
/// multiplies by the target's effective base failure probability.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CombineRule {
    #[default]
    EdgeOnly,
    EdgeTimesSusceptibility,
}

impl CombineRule {
    fn probability(&self, edge_prob: F, target_fail_prob: F) -> F {
        match self {
            Self::EdgeOnly => edge_prob,
            Self::EdgeTimesSusceptibility => edge_prob * target_fail_prob,
        }
    }
}

/// Result of one stochastic trial.
#[derive(Clone, Debug)]
pub struct CascadeOutcome {
    failed: Vec<bool>,
    n_failed: usize,
    rounds: usize,
}

impl CascadeOutcome {
    /// Total failed nodes, source included.
    pub fn total_failed(&self) -> usize {
        self.n_failed
    }

    /// C_i(v): nodes that failed beyond the source.
    pub fn additional_failures(&self) -> usize {
        self.n_failed - 1
    }

    pub fn is_failed(&self, v: NodeId) -> bool {
        self.failed.get(v).copied().unwrap_or(false)
    }

    pub fn failed_nodes(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.failed
            .iter()
            .enumerate()
            .filter_map(|(v, &f)| f.then_some(v))
    }

    /// Propagation rounds until the cascade went quiet.
    pub fn rounds(&self) -> usize {
        self.rounds
    }
}

/// Runs one failure cascade from `source` to termination.
///
/// Propagation happens in synchronous rounds: every edge (u, v) whose source
/// failed in an earlier round and whose target is still healthy gets one
/// independent draw per round. New failures only start propagating in the
/// round after they occur, and a node is never re-evaluated once failed.
/// Every currently-failed predecessor re-attempts each round, so a node with
/// several failed upstreams keeps accumulating chances until the cascade goes
/// quiet (the upper-bound policy).
///
/// The failed set is monotone and bounded by |V|, so the loop ends within
/// |V| productive rounds; exceeding either bound is an internal defect and
/// surfaces as `SimulationError`.
pub fn simulate_trial(
    graph: &Graph,
    effective: &EffectiveParams,
    source: NodeId,
    rule: CombineRule,
    rng: &mut TrialRng,
) -> Result<CascadeOutcome, SimulationError> {
    let n = graph.num_nodes();
    if source >= n {
        return Err(SimulationError::SourceOutOfRange { index: source, nodes: n });
    }

    let mut failed = vec![false; n];
    failed[source] = true;
    let mut n_failed = 1usize;
    let mut rounds = 0usize;
    let mut newly: Vec<NodeId> = Vec::new();
    // Marks nodes that failed within the current round so they are not
    // re-drawn for a later edge in the same round.
    let mut hit = vec![false; n];

    loop {
        rounds += 1;
        if rounds > n {
            return Err(SimulationError::RoundOverflow { rounds, nodes: n });
        }

        newly.clear();
        for u in 0..n {
            if !failed[u] {
                continue;
            }
            for &(v, eidx) in graph.successors(u) {
                if failed[v] || hit[v] {
                    continue;
                }
                let p = rule.probability(effective.edge_probs[eidx], effective.fail_probs[v]);
                if rng.draw() < p {
                    hit[v] = true;
                    newly.push(v);
                }
            }
        }

        if newly.is_empty() {
            break;
        }
        for &v in &newly {
            failed[v] = true;
            hit[v] = false;
            n_failed += 1;
        }
        if n_failed > n {
            return Err(SimulationError::FailedSetOverflow {
                failed: n_failed,
                nodes: n,
            });
        }
    }

    Ok(CascadeOutcome {
        failed,
        n_failed,
        rounds,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Edge;
    use crate::params::Params;

    fn graph(n: usize, edges: &[(usize, usize)]) -> Graph {
        let labels = (0..n).map(|i| format!("n{i}")).collect();
        let edges = edges.iter().map(|&(u, v)| Edge::new(u, v)).collect();
        Graph::new(labels, edges).unwrap()
    }

    fn uniform_effective(g: &Graph, edge_p: F, fail_p: F) -> EffectiveParams {
        Params {
            edge_weights: vec![edge_p; g.num_edges()],
            base_fail_probs: vec![fail_p; g.num_nodes()],
        }
        .effective(1.0)
        .unwrap()
    }

    #[test]
    fn test_certain_propagation_fails_every_reachable_node() {
        // 0 -> 1 -> 2, plus unreachable 3
        let g = graph(4, &[(0, 1), (1, 2)]);
        let eff = uniform_effective(&g, 1.0, 0.1);
        let mut rng = TrialRng::new(1);

        let outcome = simulate_trial(&g, &eff, 0, CombineRule::EdgeOnly, &mut rng).unwrap();
        assert_eq!(outcome.total_failed(), 3);
        assert_eq!(outcome.additional_failures(), 2);
        assert!(!outcome.is_failed(3));
        // Depth-2 chain plus the quiet terminating round
        assert_eq!(outcome.rounds(), 3);
    }

    #[test]
    fn test_zero_probability_never_propagates() {
        let g = graph(3, &[(0, 1), (1, 2)]);
        let eff = uniform_effective(&g, 0.0, 0.1);
        for seed in 0..20 {
            let mut rng = TrialRng::new(seed);
            let outcome = simulate_trial(&g, &eff, 0, CombineRule::EdgeOnly, &mut rng).unwrap();
            assert_eq!(outcome.additional_failures(), 0);
        }
    }

    #[test]
    fn test_isolated_source_has_zero_impact() {
        // Node 2 has no outgoing edges
        let g = graph(3, &[(0, 1), (1, 2)]);
        let eff = uniform_effective(&g, 1.0, 0.1);
        for seed in 0..20 {
            let mut rng = TrialRng::new(seed);
            let outcome = simulate_trial(&g, &eff, 2, CombineRule::EdgeOnly, &mut rng).unwrap();
            assert_eq!(outcome.additional_failures(), 0);
        }
    }

    #[test]
    fn test_self_loop_never_fires() {
        let g = graph(2, &[(0, 0), (0, 1)]);
        let eff = uniform_effective(&g, 1.0, 0.1);
        let mut rng = TrialRng::new(3);
        let outcome = simulate_trial(&g, &eff, 0, CombineRule::EdgeOnly, &mut rng).unwrap();
        assert_eq!(outcome.total_failed(), 2);
    }

    #[test]
    fn test_cycle_terminates_without_double_counting() {
        let g = graph(3, &[(0, 1), (1, 2), (2, 0)]);
        let eff = uniform_effective(&g, 1.0, 0.1);
        let mut rng = TrialRng::new(5);
        let outcome = simulate_trial(&g, &eff, 0, CombineRule::EdgeOnly, &mut rng).unwrap();
        assert_eq!(outcome.total_failed(), 3);
        assert!(outcome.rounds() <= g.num_nodes());
    }

    #[test]
    fn test_outcome_within_range_over_many_seeds() {
        let g = graph(5, &[(0, 1), (0, 2), (1, 3), (2, 3), (3, 4)]);
        let eff = uniform_effective(&g, 0.5, 0.1);
        for seed in 0..200 {
            let mut rng = TrialRng::new(seed);
            let outcome = simulate_trial(&g, &eff, 0, CombineRule::EdgeOnly, &mut rng).unwrap();
            assert!(outcome.additional_failures() <= g.num_nodes() - 1);
            assert!(outcome.is_failed(0));
        }
    }

    #[test]
    fn test_susceptibility_rule_dampens_propagation() {
        let g = graph(2, &[(0, 1)]);
        let eff = uniform_effective(&g, 1.0, 0.0);
        let mut rng = TrialRng::new(9);
        let outcome =
            simulate_trial(&g, &eff, 0, CombineRule::EdgeTimesSusceptibility, &mut rng).unwrap();
        // Certain edge, but zero susceptibility blocks the hop
        assert_eq!(outcome.additional_failures(), 0);
    }

    #[test]
    fn test_source_out_of_range() {
        let g = graph(2, &[(0, 1)]);
        let eff = uniform_effective(&g, 0.5, 0.1);
        let mut rng = TrialRng::new(1);
        let err = simulate_trial(&g, &eff, 9, CombineRule::EdgeOnly, &mut rng).unwrap_err();
        assert_eq!(err, SimulationError::SourceOutOfRange { index: 9, nodes: 2 });
    }
}
