use cascade_core::{assign, Bounds, Edge, Graph, StressLevel, StressScenario};
use cascade_sampler::{EstimateOptions, FragilityEstimator, FragilityRecord};
use std::collections::BTreeMap;

fn diamond() -> Graph {
    // Two paths from the hub plus a join, so cascades overlap
    Graph::new(
        vec![
            "hub".into(),
            "left".into(),
            "right".into(),
            "join".into(),
            "tail".into(),
        ],
        vec![
            Edge::new(0, 1),
            Edge::new(0, 2),
            Edge::new(1, 3),
            Edge::new(2, 3),
            Edge::new(3, 4),
        ],
    )
    .unwrap()
}

fn by_node(records: &[FragilityRecord]) -> BTreeMap<String, f64> {
    records
        .iter()
        .map(|r| (r.node_id.clone(), r.raw_fragility))
        .collect()
}

/// Sweep results are a pure function of (graph, params, seed): every trial
/// derives its own generator, so the rayon schedule and thread count cannot
/// leak into the estimates.
#[test]
fn sweep_is_deterministic_across_runs() {
    let graph = diamond();
    let params = assign(&graph, 42, Bounds::new(0.10, 0.65), Bounds::new(0.03, 0.12)).unwrap();
    let scenarios = [
        StressScenario {
            level: StressLevel::Low,
            multiplier: 0.5,
        },
        StressScenario {
            level: StressLevel::High,
            multiplier: 1.5,
        },
    ];
    let opts = EstimateOptions::new(400);

    let estimator = FragilityEstimator::new(&graph, &params, 42);
    let first = estimator.estimate_all(&scenarios, &opts, None).unwrap();
    let second = estimator.estimate_all(&scenarios, &opts, None).unwrap();

    assert_eq!(first.records.len(), second.records.len());
    assert_eq!(by_node(&first.records), by_node(&second.records));
}

/// A different global seed must actually change the draws.
#[test]
fn seed_changes_estimates() {
    let graph = diamond();
    let params = assign(&graph, 42, Bounds::new(0.10, 0.65), Bounds::new(0.03, 0.12)).unwrap();
    let scenario = StressScenario {
        level: StressLevel::Medium,
        multiplier: 1.0,
    };
    let opts = EstimateOptions::new(400).with_convergence(1);

    let (_, a) = FragilityEstimator::new(&graph, &params, 42)
        .estimate_node(0, scenario, &opts)
        .unwrap();
    let (_, b) = FragilityEstimator::new(&graph, &params, 1234)
        .estimate_node(0, scenario, &opts)
        .unwrap();

    // Means agree statistically but the trial-by-trial traces must differ.
    assert_ne!(
        a.unwrap().points,
        b.unwrap().points,
        "independent seeds produced identical outcome sequences"
    );
}
