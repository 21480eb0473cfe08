use crate::{
    graph_summary, load_graph, write_convergence_csv, write_fragility_csv, RunManifest,
    StressIndexModel,
};
use cascade_core::{assign, CombineRule, SimConfig, StressLevel};
use cascade_sampler::{summarize, EstimateOptions, FragilityEstimator};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cascade")]
#[command(about = "Monte Carlo cascading failure engine for dependency graphs")]
#[command(long_about = "Estimates a per-node Fragility Index by simulating \
probabilistic failure cascades under low/medium/high stress scenarios")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sweep every node under every stress scenario and write fragility tables
    Run {
        /// Node table (CSV with a 'Node' column)
        #[arg(long, default_value = "data/node.csv")]
        nodes: PathBuf,

        /// Edge table (CSV with 'node1', 'node2', 'Storage Location' columns)
        #[arg(long, default_value = "data/edge.csv")]
        edges: PathBuf,

        /// Historical stress index (CSV with a 'value' column)
        #[arg(long, default_value = "data/gcsi.csv")]
        stress: PathBuf,

        /// Random seed
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Monte Carlo trials per (node, scenario)
        #[arg(long, default_value = "500")]
        trials: usize,

        /// Probability combination rule
        #[arg(long, value_enum, default_value = "edge-only")]
        rule: RuleType,

        /// Use edge weights normalized from the data column instead of
        /// seeded random assignment
        #[arg(long)]
        data_weights: bool,

        /// Output directory
        #[arg(long, default_value = "results")]
        out: PathBuf,
    },

    /// Re-estimate one node over a ladder of trial counts
    Converge {
        #[arg(long, default_value = "data/node.csv")]
        nodes: PathBuf,

        #[arg(long, default_value = "data/edge.csv")]
        edges: PathBuf,

        #[arg(long, default_value = "data/gcsi.csv")]
        stress: PathBuf,

        /// Node label to test (default: highest out-degree node)
        #[arg(long)]
        node: Option<String>,

        /// Stress scenario to test under
        #[arg(long, value_enum, default_value = "medium")]
        level: LevelType,

        #[arg(long, default_value = "42")]
        seed: u64,

        #[arg(long, value_enum, default_value = "edge-only")]
        rule: RuleType,

        /// Output CSV file
        #[arg(long, default_value = "results/convergence_test.csv")]
        out: PathBuf,
    },

    /// Print graph and stress model diagnostics
    Summary {
        #[arg(long, default_value = "data/node.csv")]
        nodes: PathBuf,

        #[arg(long, default_value = "data/edge.csv")]
        edges: PathBuf,

        #[arg(long, default_value = "data/gcsi.csv")]
        stress: PathBuf,
    },
}

#[derive(Clone, Debug, ValueEnum)]
pub enum RuleType {
    #[value(name = "edge-only")]
    EdgeOnly,
    #[value(name = "edge-times-susceptibility")]
    EdgeTimesSusceptibility,
}

impl From<RuleType> for CombineRule {
    fn from(rule: RuleType) -> Self {
        match rule {
            RuleType::EdgeOnly => CombineRule::EdgeOnly,
            RuleType::EdgeTimesSusceptibility => CombineRule::EdgeTimesSusceptibility,
        }
    }
}

#[derive(Clone, Debug, ValueEnum)]
pub enum LevelType {
    #[value(name = "low")]
    Low,
    #[value(name = "medium")]
    Medium,
    #[value(name = "high")]
    High,
}

impl From<LevelType> for StressLevel {
    fn from(level: LevelType) -> Self {
        match level {
            LevelType::Low => StressLevel::Low,
            LevelType::Medium => StressLevel::Medium,
            LevelType::High => StressLevel::High,
        }
    }
}

pub fn run_command(
    nodes: PathBuf,
    edges: PathBuf,
    stress: PathBuf,
    seed: u64,
    trials: usize,
    rule: RuleType,
    data_weights: bool,
    out: PathBuf,
) -> anyhow::Result<()> {
    let model = StressIndexModel::from_csv(&stress)?;
    let config = SimConfig {
        seed,
        n_trials: trials,
        combine_rule: rule.into(),
        scenarios: model.scenarios()?,
        ..Default::default()
    };
    config.validate()?;

    let loaded = load_graph(&nodes, &edges, config.weight_bounds)?;
    let mut params = assign(
        &loaded.graph,
        config.seed,
        config.weight_bounds,
        config.base_fail_prob_bounds,
    )?;
    if data_weights {
        params = params.with_edge_weights(loaded.data_weights.clone());
    }

    std::fs::create_dir_all(&out)?;
    let manifest = RunManifest::new(
        config.seed,
        config.n_trials,
        config.combine_rule,
        config.weight_bounds,
        config.base_fail_prob_bounds,
        &config.scenarios,
        &loaded.graph,
    );

    println!("Cascade Fragility Sweep");
    println!("=======================");
    println!("Nodes: {}", loaded.graph.num_nodes());
    println!("Edges: {}", loaded.graph.num_edges());
    println!("Seed: {}", config.seed);
    println!("Trials per node: {}", config.n_trials);
    println!("Combine rule: {:?}", config.combine_rule);

    let estimator = FragilityEstimator::new(&loaded.graph, &params, config.seed);
    let opts = EstimateOptions::new(config.n_trials).with_rule(config.combine_rule);
    let sweep = estimator.estimate_all(&config.scenarios, &opts, None)?;

    for scenario in &config.scenarios {
        let level = scenario.level;
        let records: Vec<_> = sweep
            .records
            .iter()
            .filter(|r| r.stress_level == level)
            .cloned()
            .collect();
        if records.is_empty() {
            continue;
        }

        let outfile = out.join(format!("fragility_{level}.csv"));
        write_fragility_csv(&records, &outfile)?;

        let mean = records.iter().map(|r| r.normalized_fragility).sum::<f64>()
            / records.len() as f64;
        let top = records
            .iter()
            .max_by(|a, b| {
                a.normalized_fragility
                    .partial_cmp(&b.normalized_fragility)
                    .unwrap()
            })
            .unwrap();

        println!();
        println!("-- {} stress (multiplier {:.4}) --", level, scenario.multiplier);
        println!("Mean fragility: {:.4}", mean);
        println!(
            "Max fragility:  {:.4} ({})",
            top.normalized_fragility, top.node_id
        );
        println!("Wrote {:?}", outfile);
    }

    for failure in &sweep.failures {
        println!(
            "WARNING: unit ({}, {}) aborted: {}",
            failure.node_id, failure.stress_level, failure.error
        );
    }

    let manifest_path = out.join("manifest.json");
    manifest.save_to_file(&manifest_path)?;
    println!();
    println!("Wrote manifest to {:?}", manifest_path);

    Ok(())
}

pub fn converge_command(
    nodes: PathBuf,
    edges: PathBuf,
    stress: PathBuf,
    node: Option<String>,
    level: LevelType,
    seed: u64,
    rule: RuleType,
    out: PathBuf,
) -> anyhow::Result<()> {
    let model = StressIndexModel::from_csv(&stress)?;
    let config = SimConfig {
        seed,
        combine_rule: rule.into(),
        scenarios: model.scenarios()?,
        ..Default::default()
    };
    config.validate()?;

    let loaded = load_graph(&nodes, &edges, config.weight_bounds)?;
    let params = assign(
        &loaded.graph,
        config.seed,
        config.weight_bounds,
        config.base_fail_prob_bounds,
    )?;

    let level = StressLevel::from(level);
    let scenario = config
        .scenarios
        .iter()
        .copied()
        .find(|s| s.level == level)
        .expect("stress model always yields all three levels");

    let node_id = match &node {
        Some(label) => loaded.graph.node_id(label)?,
        None => loaded
            .graph
            .max_out_degree_node()
            .expect("loader rejects empty graphs"),
    };

    println!(
        "Convergence test on '{}' under {} stress",
        loaded.graph.label(node_id),
        level
    );

    let estimator = FragilityEstimator::new(&loaded.graph, &params, config.seed);
    let points = estimator.convergence_ladder(
        node_id,
        scenario,
        &config.convergence_sample_sizes,
        config.combine_rule,
    )?;

    for point in &points {
        println!(
            "N={:<6} mean={:.3}  std={:.3}  se={:.4}",
            point.n_trials, point.mean, point.std_dev, point.std_error
        );
    }

    // Stabilization check on the full running-mean trace of the longest rung
    let longest = config
        .convergence_sample_sizes
        .iter()
        .copied()
        .max()
        .expect("ladder is never empty");
    let opts = EstimateOptions::new(longest)
        .with_rule(config.combine_rule)
        .with_convergence(config.convergence_stride);
    let (_, sample) = estimator.estimate_node(node_id, scenario, &opts)?;
    if let Some(sample) = sample {
        let report = summarize(&sample, config.convergence_tolerance);
        match report.stabilized_at {
            Some(n) => println!(
                "Running mean stable within ±{:.3} from N={} (se={:.4})",
                report.tolerance, n, report.std_error
            ),
            None => println!("Running mean never entered the ±{:.3} band", report.tolerance),
        }
    }

    if let Some(dir) = out.parent() {
        std::fs::create_dir_all(dir)?;
    }
    write_convergence_csv(&points, &out)?;
    println!("Wrote {:?}", out);

    Ok(())
}

pub fn summary_command(nodes: PathBuf, edges: PathBuf, stress: PathBuf) -> anyhow::Result<()> {
    let config = SimConfig::default();
    let loaded = load_graph(&nodes, &edges, config.weight_bounds)?;
    let summary = graph_summary(&loaded.graph);

    println!("Graph");
    println!("=====");
    println!("Nodes: {}", summary.nodes);
    println!("Edges: {}", summary.edges);
    println!("Density: {:.4}", summary.density);
    println!("Weakly connected: {}", summary.is_weakly_connected);
    println!("Components: {}", summary.weakly_connected_components);
    println!("Avg in-degree: {:.2}", summary.avg_in_degree);
    println!("Avg out-degree: {:.2}", summary.avg_out_degree);
    println!("Isolated nodes: {}", summary.isolated_nodes);
    println!("Self-loops: {}", summary.self_loops);
    println!("Skipped edge rows: {}", loaded.skipped_edges);
    println!("Top hubs by out-degree:");
    for (label, degree) in &summary.top_hubs {
        println!("  {label}: out={degree}");
    }

    let model = StressIndexModel::from_csv(&stress)?;
    let thresholds = model.thresholds();
    println!();
    println!("Stress model");
    println!("============");
    println!("Data points: {}", model.n_values());
    println!(
        "Index range: [{:.3}, {:.3}], mean {:.3}",
        thresholds.min, thresholds.max, thresholds.mean
    );
    println!("p33: {:.3}, p66: {:.3}", thresholds.p33, thresholds.p66);
    for level in StressLevel::all() {
        println!("Multiplier {}: {:.4}", level, model.multiplier(level));
    }

    Ok(())
}
