use cascade_core::{F, StressLevel};
use serde::Serialize;

/// Running-mean trace for one (node, scenario), recorded during aggregation
/// at a fixed stride. Consumed by diagnostics only; it never feeds back into
/// the Fragility Index.
#[derive(Clone, Debug, Serialize)]
pub struct ConvergenceSample {
    pub node_id: String,
    pub stress_level: StressLevel,
    pub stride: usize,
    /// (trial count, running mean) pairs.
    pub points: Vec<(usize, F)>,
    /// Sample standard deviation at the end of the run.
    pub final_std_dev: F,
}

impl ConvergenceSample {
    pub fn new(node_id: String, stress_level: StressLevel, stride: usize) -> Self {
        Self {
            node_id,
            stress_level,
            stride: stride.max(1),
            points: Vec::new(),
            final_std_dev: 0.0,
        }
    }

    /// Record the running mean after trial `n` if `n` falls on the stride.
    pub fn record(&mut self, n: usize, running_mean: F) {
        if n % self.stride == 0 {
            self.points.push((n, running_mean));
        }
    }

    /// Append the final point if the last trial missed the stride, and pin
    /// the final standard deviation.
    pub fn seal(&mut self, n: usize, running_mean: F, std_dev: F) {
        if self.points.last().map(|&(last, _)| last) != Some(n) {
            self.points.push((n, running_mean));
        }
        self.final_std_dev = std_dev;
    }

    pub fn final_mean(&self) -> F {
        self.points.last().map(|&(_, m)| m).unwrap_or(0.0)
    }

    pub fn n_trials(&self) -> usize {
        self.points.last().map(|&(n, _)| n).unwrap_or(0)
    }
}

/// Stabilization diagnostics for a recorded running-mean trace.
#[derive(Clone, Debug, Serialize)]
pub struct ConvergenceReport {
    pub final_mean: F,
    /// stddev / sqrt(n_trials) at the end of the run.
    pub std_error: F,
    pub tolerance: F,
    /// Trial count from which the running mean stayed within ±tolerance of
    /// its final value; `None` for an empty trace.
    pub stabilized_at: Option<usize>,
}

/// Finds the earliest recorded point after which the running mean never
/// leaves the ±`tolerance` band around its final value.
pub fn summarize(sample: &ConvergenceSample, tolerance: F) -> ConvergenceReport {
    let final_mean = sample.final_mean();
    let n = sample.n_trials();
    let std_error = if n > 0 {
        sample.final_std_dev / (n as F).sqrt()
    } else {
        0.0
    };

    let mut stabilized_at = None;
    for &(count, mean) in sample.points.iter().rev() {
        if (mean - final_mean).abs() <= tolerance {
            stabilized_at = Some(count);
        } else {
            break;
        }
    }

    ConvergenceReport {
        final_mean,
        std_error,
        tolerance,
        stabilized_at,
    }
}

/// One rung of the sample-size ladder used by the convergence test.
#[derive(Clone, Debug, Serialize)]
pub struct ConvergencePoint {
    pub n_trials: usize,
    pub mean: F,
    #[serde(rename = "std")]
    pub std_dev: F,
    pub std_error: F,
    pub normalized: F,
}
