use crate::error::ConfigurationError;
use crate::params::Bounds;
use crate::stress::{StressLevel, StressScenario};
use crate::trial::CombineRule;
use serde::{Deserialize, Serialize};

/// Validated simulation configuration.
///
/// All tunables are checked once by [`SimConfig::validate`] before any
/// simulation work begins; nothing is re-validated mid-run.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub seed: u64,
    /// Monte Carlo trials per (node, scenario) unit.
    pub n_trials: usize,
    pub weight_bounds: Bounds,
    pub base_fail_prob_bounds: Bounds,
    pub combine_rule: CombineRule,
    pub scenarios: Vec<StressScenario>,
    /// Running-mean sampling stride for convergence tracking.
    pub convergence_stride: usize,
    /// Band half-width around the final running mean that counts as stable.
    pub convergence_tolerance: f64,
    /// Trial-count ladder for the convergence test.
    pub convergence_sample_sizes: Vec<usize>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            n_trials: 500,
            weight_bounds: Bounds::new(0.10, 0.65),
            base_fail_prob_bounds: Bounds::new(0.03, 0.12),
            combine_rule: CombineRule::default(),
            scenarios: vec![
                StressScenario {
                    level: StressLevel::Low,
                    multiplier: 0.5,
                },
                StressScenario {
                    level: StressLevel::Medium,
                    multiplier: 1.0,
                },
                StressScenario {
                    level: StressLevel::High,
                    multiplier: 1.5,
                },
            ],
            convergence_stride: 1,
            convergence_tolerance: 0.05,
            convergence_sample_sizes: vec![50, 100, 200, 300, 400, 500],
        }
    }
}

impl SimConfig {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.weight_bounds.validate("weight")?;
        self.base_fail_prob_bounds
            .validate("base failure probability")?;
        if self.n_trials == 0 {
            return Err(ConfigurationError::ZeroTrials);
        }
        if self.convergence_stride == 0 {
            return Err(ConfigurationError::ZeroStride);
        }
        if self.convergence_tolerance < 0.0 {
            return Err(ConfigurationError::NegativeTolerance(
                self.convergence_tolerance,
            ));
        }
        if self.convergence_sample_sizes.is_empty()
            || self.convergence_sample_sizes.iter().any(|&n| n == 0)
        {
            return Err(ConfigurationError::ZeroTrials);
        }
        for scenario in &self.scenarios {
            if scenario.multiplier < 0.0 {
                return Err(ConfigurationError::NegativeMultiplier(scenario.multiplier));
            }
        }
        Ok(())
    }

    pub fn multiplier(&self, level: StressLevel) -> Option<f64> {
        self.scenarios
            .iter()
            .find(|s| s.level == level)
            .map(|s| s.multiplier)
    }
}
