use anyhow::{bail, Context};
use cascade_core::{Bounds, Edge, Graph, F};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Graph plus the edge weights derived from the raw data column.
///
/// The data-derived weights are min-max normalized into the configured
/// weight bounds and can replace the randomly assigned ones via
/// `Params::with_edge_weights`.
#[derive(Debug)]
pub struct LoadedGraph {
    pub graph: Graph,
    pub data_weights: Vec<F>,
    pub skipped_edges: usize,
}

struct RawEdge {
    src: usize,
    tgt: usize,
    raw_weight: F,
}

/// Loads node.csv + edge.csv into a dependency graph.
///
/// Node labels come from the `Node` column in row order; edges reference
/// nodes by row index. Duplicate (source, target) rows keep the higher raw
/// weight; rows pointing at unknown indices are skipped and counted.
pub fn load_graph(
    node_csv: &Path,
    edge_csv: &Path,
    weight_bounds: Bounds,
) -> anyhow::Result<LoadedGraph> {
    let nodes = read_nodes(
        File::open(node_csv).with_context(|| format!("node file not found: {node_csv:?}"))?,
    )?;
    let raw_edges = read_edges(
        File::open(edge_csv).with_context(|| format!("edge file not found: {edge_csv:?}"))?,
    )?;
    build_graph(nodes, raw_edges, weight_bounds)
}

/// Reads the `Node` column of node.csv.
pub fn read_nodes<R: Read>(reader: R) -> anyhow::Result<Vec<String>> {
    let mut csv = csv::Reader::from_reader(reader);
    let headers = csv.headers().context("reading node CSV header")?;
    let col = headers
        .iter()
        .position(|h| h == "Node")
        .context("node CSV must contain a 'Node' column")?;

    let mut nodes = Vec::new();
    for record in csv.records() {
        let record = record.context("reading node CSV row")?;
        let name = record
            .get(col)
            .context("node CSV row missing the 'Node' field")?;
        nodes.push(name.trim().to_string());
    }
    if nodes.is_empty() {
        bail!("node CSV is empty");
    }
    tracing::info!(nodes = nodes.len(), "loaded node names");
    Ok(nodes)
}

/// Reads edge.csv rows: `node1`, `node2` (row indices into node.csv) and the
/// raw `Storage Location` column that seeds the data-derived weights.
fn read_edges<R: Read>(reader: R) -> anyhow::Result<Vec<RawEdge>> {
    let mut csv = csv::Reader::from_reader(reader);
    let headers = csv.headers().context("reading edge CSV header")?;
    let col = |name: &str| {
        headers
            .iter()
            .position(|h| h == name)
            .with_context(|| format!("edge CSV must contain a '{name}' column"))
    };
    let src_col = col("node1")?;
    let tgt_col = col("node2")?;
    let weight_col = col("Storage Location")?;

    let mut edges = Vec::new();
    for record in csv.records() {
        let record = record.context("reading edge CSV row")?;
        let field = |i: usize| record.get(i).unwrap_or("").trim();
        let (Ok(src), Ok(tgt), Ok(raw_weight)) = (
            field(src_col).parse::<usize>(),
            field(tgt_col).parse::<usize>(),
            field(weight_col).parse::<F>(),
        ) else {
            // Unparseable rows are treated like unmapped indices below
            edges.push(RawEdge {
                src: usize::MAX,
                tgt: usize::MAX,
                raw_weight: 0.0,
            });
            continue;
        };
        edges.push(RawEdge {
            src,
            tgt,
            raw_weight,
        });
    }
    Ok(edges)
}

fn build_graph(
    nodes: Vec<String>,
    raw_edges: Vec<RawEdge>,
    weight_bounds: Bounds,
) -> anyhow::Result<LoadedGraph> {
    let n = nodes.len();

    // Min-max normalize the raw column into the weight bounds
    let valid: Vec<F> = raw_edges
        .iter()
        .filter(|e| e.src < n && e.tgt < n)
        .map(|e| e.raw_weight)
        .collect();
    let raw_min = valid.iter().cloned().fold(F::INFINITY, F::min);
    let raw_max = valid.iter().cloned().fold(F::NEG_INFINITY, F::max);
    let span = raw_max - raw_min;
    let normalize = |raw: F| {
        if span > 0.0 {
            weight_bounds.min + (raw - raw_min) / span * (weight_bounds.max - weight_bounds.min)
        } else {
            weight_bounds.midpoint()
        }
    };

    // Deduplicate, keeping the higher weight per (source, target)
    let mut skipped = 0usize;
    let mut order: Vec<(usize, usize)> = Vec::new();
    let mut best: HashMap<(usize, usize), F> = HashMap::new();
    for edge in &raw_edges {
        if edge.src >= n || edge.tgt >= n {
            skipped += 1;
            continue;
        }
        let key = (edge.src, edge.tgt);
        let weight = normalize(edge.raw_weight);
        match best.entry(key) {
            Entry::Occupied(mut occupied) => {
                let existing = occupied.get_mut();
                *existing = existing.max(weight);
            }
            Entry::Vacant(vacant) => {
                vacant.insert(weight);
                order.push(key);
            }
        }
    }
    if skipped > 0 {
        tracing::warn!(skipped, "skipped edges with unmapped indices");
    }

    let edges: Vec<Edge> = order.iter().map(|&(u, v)| Edge::new(u, v)).collect();
    let data_weights: Vec<F> = order.iter().map(|key| best[key]).collect();

    let graph = Graph::new(nodes, edges)?;
    tracing::info!(
        nodes = graph.num_nodes(),
        edges = graph.num_edges(),
        "graph constructed"
    );

    Ok(LoadedGraph {
        graph,
        data_weights,
        skipped_edges: skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const NODES: &str = "Node,Category\nplant_a,site\nplant_b,site\ndepot,warehouse\n";

    fn load(nodes: &str, edges: &str) -> LoadedGraph {
        let names = read_nodes(nodes.as_bytes()).unwrap();
        let raw = read_edges(edges.as_bytes()).unwrap();
        build_graph(names, raw, Bounds::new(0.10, 0.65)).unwrap()
    }

    #[test]
    fn test_load_and_normalize() {
        let edges = "node1,node2,Storage Location\n0,1,100\n1,2,300\n0,2,200\n";
        let loaded = load(NODES, edges);

        assert_eq!(loaded.graph.num_nodes(), 3);
        assert_eq!(loaded.graph.num_edges(), 3);
        assert_eq!(loaded.skipped_edges, 0);
        // Extremes map onto the bounds, the midpoint lands between
        assert!((loaded.data_weights[0] - 0.10).abs() < 1e-12);
        assert!((loaded.data_weights[1] - 0.65).abs() < 1e-12);
        assert!((loaded.data_weights[2] - 0.375).abs() < 1e-12);
    }

    #[test]
    fn test_duplicate_rows_keep_higher_weight() {
        let edges = "node1,node2,Storage Location\n0,1,100\n0,1,300\n1,2,300\n";
        let loaded = load(NODES, edges);

        assert_eq!(loaded.graph.num_edges(), 2);
        assert!((loaded.data_weights[0] - 0.65).abs() < 1e-12);
    }

    #[test]
    fn test_unmapped_indices_are_skipped() {
        let edges = "node1,node2,Storage Location\n0,1,100\n7,2,300\n1,oops,200\n";
        let loaded = load(NODES, edges);

        assert_eq!(loaded.graph.num_edges(), 1);
        assert_eq!(loaded.skipped_edges, 2);
    }

    #[test]
    fn test_degenerate_column_maps_to_midpoint() {
        let edges = "node1,node2,Storage Location\n0,1,250\n1,2,250\n";
        let loaded = load(NODES, edges);
        assert!(loaded.data_weights.iter().all(|&w| (w - 0.375).abs() < 1e-12));
    }

    #[test]
    fn test_empty_node_file_rejected() {
        assert!(read_nodes("Node\n".as_bytes()).is_err());
    }

    #[test]
    fn test_missing_node_column_rejected() {
        assert!(read_nodes("Name\nplant_a\n".as_bytes()).is_err());
    }
}
