pub mod convergence;
pub mod stats;

pub use convergence::{summarize, ConvergencePoint, ConvergenceReport, ConvergenceSample};
pub use stats::RunningStats;

use cascade_core::{
    simulate_trial, unit_seed, CascadeError, CombineRule, ConfigurationError, EffectiveParams,
    Graph, NodeId, Params, SimulationError, StressScenario, TrialRng, F,
};
use rayon::prelude::*;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Fragility Index and summary statistics for one (node, scenario).
///
/// Plain immutable value object; safe to hand to any downstream format.
#[derive(Clone, Debug, Serialize)]
pub struct FragilityRecord {
    pub node_id: String,
    pub stress_level: cascade_core::StressLevel,
    /// F(v): mean additional failures per trial.
    pub raw_fragility: F,
    /// F(v) scaled by |V| - 1 into [0, 1].
    pub normalized_fragility: F,
    #[serde(rename = "std")]
    pub std_dev: F,
    pub min_impact: usize,
    pub max_impact: usize,
    pub n_trials: usize,
}

/// Per-estimate knobs, resolved from `SimConfig` or built directly.
#[derive(Clone, Debug)]
pub struct EstimateOptions {
    pub n_trials: usize,
    pub combine_rule: CombineRule,
    /// Record the running mean every `stride` trials when set.
    pub track_convergence: Option<usize>,
}

impl EstimateOptions {
    pub fn new(n_trials: usize) -> Self {
        Self {
            n_trials,
            combine_rule: CombineRule::default(),
            track_convergence: None,
        }
    }

    pub fn with_rule(mut self, rule: CombineRule) -> Self {
        self.combine_rule = rule;
        self
    }

    pub fn with_convergence(mut self, stride: usize) -> Self {
        self.track_convergence = Some(stride.max(1));
        self
    }

    fn validate(&self) -> Result<(), ConfigurationError> {
        if self.n_trials == 0 {
            return Err(ConfigurationError::ZeroTrials);
        }
        Ok(())
    }
}

/// Run-level cancellation flag, honored between (node, scenario) units.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// A (node, scenario) unit that hit an internal invariant violation.
/// The rest of the sweep is unaffected.
#[derive(Clone, Debug)]
pub struct UnitFailure {
    pub node_id: String,
    pub stress_level: cascade_core::StressLevel,
    pub error: SimulationError,
}

/// Everything a full sweep produced.
#[derive(Clone, Debug)]
pub struct SweepOutcome {
    pub records: Vec<FragilityRecord>,
    pub failures: Vec<UnitFailure>,
    pub cancelled: bool,
}

/// Monte Carlo driver over a frozen graph + parameter snapshot.
///
/// Workers only read the shared graph and effective parameters; every trial
/// owns a private generator derived from (global seed, node, stress level,
/// trial index), so estimates are reproducible under any parallel schedule.
pub struct FragilityEstimator<'a> {
    graph: &'a Graph,
    params: &'a Params,
    seed: u64,
}

impl<'a> FragilityEstimator<'a> {
    pub fn new(graph: &'a Graph, params: &'a Params, seed: u64) -> Self {
        Self { graph, params, seed }
    }

    /// Estimate the Fragility Index for a single node under one scenario.
    pub fn estimate_node(
        &self,
        node: NodeId,
        scenario: StressScenario,
        opts: &EstimateOptions,
    ) -> Result<(FragilityRecord, Option<ConvergenceSample>), CascadeError> {
        opts.validate()?;
        if node >= self.graph.num_nodes() {
            return Err(cascade_core::InvalidGraphError::NodeOutOfRange {
                index: node,
                nodes: self.graph.num_nodes(),
            }
            .into());
        }
        let effective = self.params.effective(scenario.multiplier)?;
        self.run_unit(node, scenario, &effective, opts)
            .map_err(CascadeError::from)
    }

    /// Same as `estimate_node`, resolving the node by label.
    pub fn estimate_label(
        &self,
        label: &str,
        scenario: StressScenario,
        opts: &EstimateOptions,
    ) -> Result<(FragilityRecord, Option<ConvergenceSample>), CascadeError> {
        let node = self.graph.node_id(label)?;
        self.estimate_node(node, scenario, opts)
    }

    /// Sweep every node under every scenario in parallel.
    ///
    /// Configuration errors fail the whole sweep up front; a
    /// `SimulationError` aborts only its own unit and is reported in
    /// `failures`. Cancellation is honored between units.
    pub fn estimate_all(
        &self,
        scenarios: &[StressScenario],
        opts: &EstimateOptions,
        cancel: Option<&CancelToken>,
    ) -> Result<SweepOutcome, CascadeError> {
        opts.validate()?;
        let n = self.graph.num_nodes();
        if n == 0 {
            return Err(ConfigurationError::EmptyGraph.into());
        }

        // Sweep units never record convergence traces; sample a node
        // separately with estimate_node when a trace is wanted.
        let unit_opts = EstimateOptions {
            track_convergence: None,
            ..opts.clone()
        };

        let mut records = Vec::with_capacity(n * scenarios.len());
        let mut failures = Vec::new();

        for scenario in scenarios {
            let effective = self.params.effective(scenario.multiplier)?;
            tracing::info!(
                stress_level = scenario.level.name(),
                multiplier = scenario.multiplier,
                nodes = n,
                trials = opts.n_trials,
                "sweeping scenario"
            );

            let done = AtomicUsize::new(0);
            let units: Vec<(NodeId, Result<FragilityRecord, SimulationError>)> = (0..n)
                .into_par_iter()
                .filter_map(|node| {
                    if cancel.is_some_and(|c| c.is_cancelled()) {
                        return None;
                    }
                    let result = self
                        .run_unit(node, *scenario, &effective, &unit_opts)
                        .map(|(record, _)| record);

                    let finished = done.fetch_add(1, Ordering::Relaxed) + 1;
                    if finished % 10 == 0 || finished == n {
                        tracing::info!(progress = finished, total = n, "nodes complete");
                    }
                    Some((node, result))
                })
                .collect();

            let completed = units.len();
            for (node, result) in units {
                match result {
                    Ok(record) => records.push(record),
                    Err(error) => {
                        tracing::warn!(
                            node = self.graph.label(node),
                            %error,
                            "unit aborted, continuing sweep"
                        );
                        failures.push(UnitFailure {
                            node_id: self.graph.label(node).to_string(),
                            stress_level: scenario.level,
                            error,
                        });
                    }
                }
            }

            if completed < n {
                return Ok(SweepOutcome {
                    records,
                    failures,
                    cancelled: true,
                });
            }
        }

        Ok(SweepOutcome {
            records,
            failures,
            cancelled: false,
        })
    }

    /// Re-estimate one node across a ladder of trial counts.
    ///
    /// Trial i draws the same stream regardless of the ladder rung, so the
    /// rungs are prefixes of one fixed seed sequence and the standard error
    /// shrinks as the count grows.
    pub fn convergence_ladder(
        &self,
        node: NodeId,
        scenario: StressScenario,
        sample_sizes: &[usize],
        rule: CombineRule,
    ) -> Result<Vec<ConvergencePoint>, CascadeError> {
        let denominator = (self.graph.num_nodes() - 1).max(1) as F;
        let mut points = Vec::with_capacity(sample_sizes.len());
        for &n_trials in sample_sizes {
            let opts = EstimateOptions::new(n_trials).with_rule(rule);
            let (record, _) = self.estimate_node(node, scenario, &opts)?;
            points.push(ConvergencePoint {
                n_trials,
                mean: record.raw_fragility,
                std_dev: record.std_dev,
                std_error: record.std_dev / (n_trials as F).sqrt(),
                normalized: record.raw_fragility / denominator,
            });
        }
        Ok(points)
    }

    fn run_unit(
        &self,
        node: NodeId,
        scenario: StressScenario,
        effective: &EffectiveParams,
        opts: &EstimateOptions,
    ) -> Result<(FragilityRecord, Option<ConvergenceSample>), SimulationError> {
        let label = self.graph.label(node).to_string();
        let useed = unit_seed(self.seed, node as u64, scenario.level.channel());

        let mut stats = RunningStats::new();
        let mut sample = opts
            .track_convergence
            .map(|stride| ConvergenceSample::new(label.clone(), scenario.level, stride));

        for trial in 0..opts.n_trials {
            let mut rng = TrialRng::from_trial_id(useed, trial as u64);
            let outcome = simulate_trial(self.graph, effective, node, opts.combine_rule, &mut rng)?;
            stats.push(outcome.additional_failures() as F);
            if let Some(sample) = &mut sample {
                sample.record(stats.count(), stats.mean());
            }
        }
        if let Some(sample) = &mut sample {
            sample.seal(stats.count(), stats.mean(), stats.std_dev());
        }

        let denominator = (self.graph.num_nodes() - 1).max(1) as F;
        let record = FragilityRecord {
            node_id: label,
            stress_level: scenario.level,
            raw_fragility: stats.mean(),
            normalized_fragility: stats.mean() / denominator,
            std_dev: stats.std_dev(),
            min_impact: stats.min() as usize,
            max_impact: stats.max() as usize,
            n_trials: stats.count(),
        };
        Ok((record, sample))
    }
}
