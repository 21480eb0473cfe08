use cascade_core::{Bounds, CombineRule, Graph, StressScenario, F};
use cascade_sampler::{ConvergencePoint, FragilityRecord};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

pub mod cli;
pub mod graph_csv;
pub mod stress_index;

pub use graph_csv::{load_graph, LoadedGraph};
pub use stress_index::StressIndexModel;

/// Run manifest for complete reproducibility
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunManifest {
    pub run_id: String,
    pub timestamp: String,
    pub seed: u64,
    pub n_trials: usize,
    pub combine_rule: CombineRule,
    pub weight_bounds: Bounds,
    pub base_fail_prob_bounds: Bounds,
    pub scenarios: Vec<StressScenario>,
    pub n_nodes: usize,
    pub n_edges: usize,
    pub commit_hash: Option<String>,
    pub rust_version: String,
}

impl RunManifest {
    pub fn new(
        seed: u64,
        n_trials: usize,
        combine_rule: CombineRule,
        weight_bounds: Bounds,
        base_fail_prob_bounds: Bounds,
        scenarios: &[StressScenario],
        graph: &Graph,
    ) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            seed,
            n_trials,
            combine_rule,
            weight_bounds,
            base_fail_prob_bounds,
            scenarios: scenarios.to_vec(),
            n_nodes: graph.num_nodes(),
            n_edges: graph.num_edges(),
            commit_hash: get_git_commit(),
            rust_version: get_rust_version(),
        }
    }

    pub fn save_to_file(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let manifest = serde_json::from_str(&json)?;
        Ok(manifest)
    }
}

/// Writes one fragility table (node_id, stress_level, raw_fragility, ...).
pub fn write_fragility_csv(records: &[FragilityRecord], path: &Path) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes the convergence ladder (n_trials, mean, std, std_error, normalized).
pub fn write_convergence_csv(points: &[ConvergencePoint], path: &Path) -> anyhow::Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    for point in points {
        writer.serialize(point)?;
    }
    writer.flush()?;
    Ok(())
}

/// Structural diagnostics of the dependency graph.
///
/// A graph that is disconnected or full of sinks is legitimate input; this
/// summary flags it for the caller instead of erroring.
#[derive(Clone, Debug, Serialize)]
pub struct GraphSummary {
    pub nodes: usize,
    pub edges: usize,
    pub density: F,
    pub is_weakly_connected: bool,
    pub weakly_connected_components: usize,
    pub avg_in_degree: F,
    pub avg_out_degree: F,
    pub isolated_nodes: usize,
    pub self_loops: usize,
    /// Highest out-degree nodes, the likeliest cascade sources.
    pub top_hubs: Vec<(String, usize)>,
}

pub fn graph_summary(graph: &Graph) -> GraphSummary {
    let n = graph.num_nodes();
    let e = graph.num_edges();

    let mut in_degree = vec![0usize; n];
    let mut self_loops = 0usize;
    for edge in graph.edges() {
        in_degree[edge.v] += 1;
        if edge.u == edge.v {
            self_loops += 1;
        }
    }

    let isolated = (0..n)
        .filter(|&v| in_degree[v] == 0 && graph.out_degree(v) == 0)
        .count();

    let mut hubs: Vec<(String, usize)> = (0..n)
        .map(|v| (graph.label(v).to_string(), graph.out_degree(v)))
        .collect();
    hubs.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    hubs.truncate(5);

    let components = weakly_connected_components(graph);

    GraphSummary {
        nodes: n,
        edges: e,
        density: if n > 1 {
            e as F / (n * (n - 1)) as F
        } else {
            0.0
        },
        is_weakly_connected: components == 1,
        weakly_connected_components: components,
        avg_in_degree: e as F / n.max(1) as F,
        avg_out_degree: e as F / n.max(1) as F,
        isolated_nodes: isolated,
        self_loops,
        top_hubs: hubs,
    }
}

/// Component count of the graph with edge directions ignored.
fn weakly_connected_components(graph: &Graph) -> usize {
    let n = graph.num_nodes();
    if n == 0 {
        return 0;
    }

    let mut undirected = vec![Vec::new(); n];
    for edge in graph.edges() {
        undirected[edge.u].push(edge.v);
        undirected[edge.v].push(edge.u);
    }

    let mut visited = vec![false; n];
    let mut components = 0usize;
    let mut stack = Vec::new();
    for start in 0..n {
        if visited[start] {
            continue;
        }
        components += 1;
        visited[start] = true;
        stack.push(start);
        while let Some(u) = stack.pop() {
            for &v in &undirected[u] {
                if !visited[v] {
                    visited[v] = true;
                    stack.push(v);
                }
            }
        }
    }
    components
}

fn get_git_commit() -> Option<String> {
    std::process::Command::new("git")
        .args(["rev-parse", "HEAD"])
        .output()
        .ok()
        .and_then(|output| {
            if output.status.success() {
                String::from_utf8(output.stdout).ok()
            } else {
                None
            }
        })
        .map(|s| s.trim().to_string())
}

fn get_rust_version() -> String {
    std::process::Command::new("rustc")
        .arg("--version")
        .output()
        .ok()
        .and_then(|output| {
            if output.status.success() {
                String::from_utf8(output.stdout).ok()
            } else {
                None
            }
        })
        .map(|s| s.trim().to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
