use crate::error::InvalidGraphError;
use crate::NodeId;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Directed edge between two node indices
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub u: NodeId, // source node id
    pub v: NodeId, // target node id
}

impl Edge {
    pub fn new(u: NodeId, v: NodeId) -> Self {
        Self { u, v }
    }
}

/// Directed dependency graph.
///
/// Nodes carry a stable unique label and are addressed by dense indices.
/// Topology is frozen at construction; the simulation never mutates it.
/// Self-loops are tolerated (they can never fire, the target is already
/// failed when the source is).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Graph {
    labels: Vec<String>,
    edges: Vec<Edge>,
    adjacency: Vec<Vec<(NodeId, usize)>>, // (target, edge index)
    index: HashMap<String, NodeId>,
}

impl Graph {
    /// Builds the graph and its adjacency lists, rejecting duplicate labels,
    /// duplicate (source, target) pairs, and out-of-range endpoints.
    pub fn new(labels: Vec<String>, edges: Vec<Edge>) -> Result<Self, InvalidGraphError> {
        let n = labels.len();

        let mut index = HashMap::with_capacity(n);
        for (id, label) in labels.iter().enumerate() {
            if index.insert(label.clone(), id).is_some() {
                return Err(InvalidGraphError::DuplicateLabel(label.clone()));
            }
        }

        let mut seen = HashSet::with_capacity(edges.len());
        let mut adjacency = vec![Vec::new(); n];
        for (eidx, edge) in edges.iter().enumerate() {
            for endpoint in [edge.u, edge.v] {
                if endpoint >= n {
                    return Err(InvalidGraphError::EndpointOutOfRange {
                        index: endpoint,
                        nodes: n,
                    });
                }
            }
            if !seen.insert((edge.u, edge.v)) {
                return Err(InvalidGraphError::DuplicateEdge {
                    from: labels[edge.u].clone(),
                    to: labels[edge.v].clone(),
                });
            }
            adjacency[edge.u].push((edge.v, eidx));
        }

        Ok(Self {
            labels,
            edges,
            adjacency,
            index,
        })
    }

    pub fn num_nodes(&self) -> usize {
        self.labels.len()
    }

    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn label(&self, id: NodeId) -> &str {
        &self.labels[id]
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Resolve a label to its node index.
    pub fn node_id(&self, label: &str) -> Result<NodeId, InvalidGraphError> {
        self.index
            .get(label)
            .copied()
            .ok_or_else(|| InvalidGraphError::UnknownNode(label.to_string()))
    }

    /// Outgoing neighbors of `u` with the index of the connecting edge.
    pub fn successors(&self, u: NodeId) -> &[(NodeId, usize)] {
        self.adjacency.get(u).map(|v| v.as_slice()).unwrap_or(&[])
    }

    pub fn out_degree(&self, u: NodeId) -> usize {
        self.successors(u).len()
    }

    /// Node with the most outgoing edges (ties broken by index).
    pub fn max_out_degree_node(&self) -> Option<NodeId> {
        (0..self.num_nodes()).max_by_key(|&u| (self.out_degree(u), std::cmp::Reverse(u)))
    }
}
