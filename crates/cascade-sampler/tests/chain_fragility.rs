use cascade_core::{Edge, Graph, Params, StressLevel, StressScenario};
use cascade_sampler::{EstimateOptions, FragilityEstimator};

/// A -> B -> C with propagation probability 0.5 on both edges and no
/// intrinsic failures. The cascade must pass through B before reaching C:
///   F(A) = 0.5 * 1 + 0.5 * 0.5 * 1 = 0.75
///   F(B) = 0.5,  F(C) = 0
#[test]
fn chain_fragility_matches_closed_form() {
    let graph = Graph::new(
        vec!["A".into(), "B".into(), "C".into()],
        vec![Edge::new(0, 1), Edge::new(1, 2)],
    )
    .unwrap();
    let params = Params {
        edge_weights: vec![0.5, 0.5],
        base_fail_probs: vec![0.0, 0.0, 0.0],
    };

    let n_trials = 10_000;
    let estimator = FragilityEstimator::new(&graph, &params, 42);
    let scenario = StressScenario {
        level: StressLevel::Medium,
        multiplier: 1.0,
    };
    let opts = EstimateOptions::new(n_trials);

    let (f_a, _) = estimator.estimate_label("A", scenario, &opts).unwrap();
    let (f_b, _) = estimator.estimate_label("B", scenario, &opts).unwrap();
    let (f_c, _) = estimator.estimate_label("C", scenario, &opts).unwrap();

    // Var(C(A)) = 0.6875, so the standard error at 10k trials is ~0.008;
    // 0.05 is a >5-sigma band.
    assert!(
        (f_a.raw_fragility - 0.75).abs() < 0.05,
        "F(A) = {} too far from 0.75",
        f_a.raw_fragility
    );
    assert!(
        (f_b.raw_fragility - 0.5).abs() < 0.05,
        "F(B) = {} too far from 0.5",
        f_b.raw_fragility
    );
    assert_eq!(f_c.raw_fragility, 0.0);

    assert!(f_a.max_impact <= 2);
    assert!(f_a.normalized_fragility >= 0.0 && f_a.normalized_fragility <= 1.0);
}

/// Expected fragility grows with the stress multiplier for any source with
/// outgoing edges. Statistical property, checked with generous margins.
#[test]
fn fragility_is_monotone_in_stress() {
    let graph = Graph::new(
        vec!["A".into(), "B".into(), "C".into()],
        vec![Edge::new(0, 1), Edge::new(1, 2)],
    )
    .unwrap();
    let params = Params {
        edge_weights: vec![0.5, 0.5],
        base_fail_probs: vec![0.0, 0.0, 0.0],
    };

    let estimator = FragilityEstimator::new(&graph, &params, 42);
    let opts = EstimateOptions::new(5_000);

    let mut means = Vec::new();
    for (level, multiplier) in [
        (StressLevel::Low, 0.5),
        (StressLevel::Medium, 1.0),
        (StressLevel::High, 1.5),
    ] {
        let scenario = StressScenario { level, multiplier };
        let (record, _) = estimator.estimate_label("A", scenario, &opts).unwrap();
        means.push(record.raw_fragility);
    }

    // Closed-form means are 0.3125, 0.75, 1.3125; gaps dwarf the noise.
    assert!(means[0] + 0.1 < means[1], "low {} !< medium {}", means[0], means[1]);
    assert!(means[1] + 0.1 < means[2], "medium {} !< high {}", means[1], means[2]);
}
