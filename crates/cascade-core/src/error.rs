use crate::F;
use thiserror::Error;

/// Rejected before any trial runs. Deterministic, never retried.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("inverted {what} bounds: min {min} exceeds max {max}")]
    InvertedBounds { what: &'static str, min: F, max: F },

    #[error("{what} bounds [{min}, {max}] fall outside [0, 1]")]
    BoundsOutOfRange { what: &'static str, min: F, max: F },

    #[error("stress multiplier must be non-negative, got {0}")]
    NegativeMultiplier(F),

    #[error("at least one trial is required")]
    ZeroTrials,

    #[error("graph has no nodes")]
    EmptyGraph,

    #[error("convergence stride must be at least 1")]
    ZeroStride,

    #[error("convergence tolerance must be non-negative, got {0}")]
    NegativeTolerance(F),
}

/// Malformed topology, caught when the graph is built or a node is resolved.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum InvalidGraphError {
    #[error("duplicate node label '{0}'")]
    DuplicateLabel(String),

    #[error("duplicate edge {from} -> {to}")]
    DuplicateEdge { from: String, to: String },

    #[error("edge endpoint {index} out of range ({nodes} nodes)")]
    EndpointOutOfRange { index: usize, nodes: usize },

    #[error("node '{0}' not found in graph")]
    UnknownNode(String),

    #[error("node index {index} out of range ({nodes} nodes)")]
    NodeOutOfRange { index: usize, nodes: usize },
}

/// Internal invariant violation. A programming defect, never clamped; aborts
/// the offending (node, scenario) unit only.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum SimulationError {
    #[error("source node {index} out of range ({nodes} nodes)")]
    SourceOutOfRange { index: usize, nodes: usize },

    #[error("failed set grew to {failed} nodes in a {nodes}-node graph")]
    FailedSetOverflow { failed: usize, nodes: usize },

    #[error("cascade ran {rounds} rounds in a {nodes}-node graph without terminating")]
    RoundOverflow { rounds: usize, nodes: usize },
}

#[derive(Clone, Debug, PartialEq, Error)]
pub enum CascadeError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Graph(#[from] InvalidGraphError),

    #[error(transparent)]
    Simulation(#[from] SimulationError),
}
