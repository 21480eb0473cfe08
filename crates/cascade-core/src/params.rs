use crate::error::{CascadeError, ConfigurationError};
use crate::graph::Graph;
use crate::rng::TrialRng;
use crate::{F, NodeId};
use serde::{Deserialize, Serialize};

/// Closed interval used for uniform parameter draws.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: F,
    pub max: F,
}

impl Bounds {
    pub fn new(min: F, max: F) -> Self {
        Self { min, max }
    }

    pub fn midpoint(&self) -> F {
        (self.min + self.max) / 2.0
    }

    pub fn contains(&self, x: F) -> bool {
        x >= self.min && x <= self.max
    }

    pub fn validate(&self, what: &'static str) -> Result<(), ConfigurationError> {
        if self.min > self.max {
            return Err(ConfigurationError::InvertedBounds {
                what,
                min: self.min,
                max: self.max,
            });
        }
        if self.min < 0.0 || self.max > 1.0 {
            return Err(ConfigurationError::BoundsOutOfRange {
                what,
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }
}

/// Stochastic parameters assigned once per (graph, seed).
///
/// `edge_weights[e]` is the propagation probability of edge `e`;
/// `base_fail_probs[v]` is the intrinsic susceptibility of node `v`.
/// Both are read-only snapshots after assignment.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Params {
    pub edge_weights: Vec<F>,
    pub base_fail_probs: Vec<F>,
}

impl Params {
    /// Replace the assigned edge weights with externally derived ones
    /// (e.g. normalized from a data column). Lengths must match.
    pub fn with_edge_weights(mut self, weights: Vec<F>) -> Self {
        assert_eq!(weights.len(), self.edge_weights.len());
        self.edge_weights = weights;
        self
    }
}

/// Draws one propagation probability per edge and one base failure
/// probability per node, uniformly within the given bounds.
///
/// Nodes are visited in label order and edges in (source label, target label)
/// order, so the output is a pure function of (graph, seed).
pub fn assign(
    graph: &Graph,
    seed: u64,
    weight_bounds: Bounds,
    fail_prob_bounds: Bounds,
) -> Result<Params, CascadeError> {
    weight_bounds.validate("weight")?;
    fail_prob_bounds.validate("base failure probability")?;
    if graph.num_nodes() == 0 {
        return Err(ConfigurationError::EmptyGraph.into());
    }

    let mut rng = TrialRng::new(seed);

    let mut edge_order: Vec<usize> = (0..graph.num_edges()).collect();
    edge_order.sort_by(|&a, &b| {
        let ea = graph.edges()[a];
        let eb = graph.edges()[b];
        (graph.label(ea.u), graph.label(ea.v)).cmp(&(graph.label(eb.u), graph.label(eb.v)))
    });

    let mut edge_weights = vec![0.0; graph.num_edges()];
    for eidx in edge_order {
        edge_weights[eidx] = rng.draw_range(weight_bounds.min, weight_bounds.max);
    }

    let mut node_order: Vec<NodeId> = (0..graph.num_nodes()).collect();
    node_order.sort_by(|&a, &b| graph.label(a).cmp(graph.label(b)));

    let mut base_fail_probs = vec![0.0; graph.num_nodes()];
    for v in node_order {
        base_fail_probs[v] = rng.draw_range(fail_prob_bounds.min, fail_prob_bounds.max);
    }

    Ok(Params {
        edge_weights,
        base_fail_probs,
    })
}
