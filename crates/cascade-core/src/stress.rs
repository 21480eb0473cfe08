use crate::error::ConfigurationError;
use crate::params::Params;
use crate::F;
use serde::{Deserialize, Serialize};

/// Qualitative stress regime.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StressLevel {
    Low,
    Medium,
    High,
}

impl StressLevel {
    pub fn all() -> [Self; 3] {
        [Self::Low, Self::Medium, Self::High]
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// Stable discriminant used for per-unit seed derivation.
    pub fn channel(&self) -> u64 {
        match self {
            Self::Low => 0,
            Self::Medium => 1,
            Self::High => 2,
        }
    }
}

impl std::fmt::Display for StressLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One stress regime with its externally supplied multiplier.
///
/// The multiplier is opaque to the core; deriving it from a historical
/// index is the stress model's concern.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct StressScenario {
    pub level: StressLevel,
    pub multiplier: F,
}

impl StressScenario {
    pub fn new(level: StressLevel, multiplier: F) -> Result<Self, ConfigurationError> {
        if multiplier < 0.0 {
            return Err(ConfigurationError::NegativeMultiplier(multiplier));
        }
        Ok(Self { level, multiplier })
    }
}

/// Per-scenario probabilities: assigned parameters scaled by the stress
/// multiplier and clamped to [0, 1]. Read-only during simulation.
#[derive(Clone, Debug, PartialEq)]
pub struct EffectiveParams {
    pub edge_probs: Vec<F>,
    pub fail_probs: Vec<F>,
}

impl Params {
    /// Scale every propagation and base failure probability by `multiplier`,
    /// clamping each result to [0, 1]. Pure; called once per scenario.
    pub fn effective(&self, multiplier: F) -> Result<EffectiveParams, ConfigurationError> {
        if multiplier < 0.0 {
            return Err(ConfigurationError::NegativeMultiplier(multiplier));
        }
        let scale = |p: &F| (p * multiplier).clamp(0.0, 1.0);
        Ok(EffectiveParams {
            edge_probs: self.edge_weights.iter().map(scale).collect(),
            fail_probs: self.base_fail_probs.iter().map(scale).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> Params {
        Params {
            edge_weights: vec![0.10, 0.40, 0.65],
            base_fail_probs: vec![0.03, 0.12],
        }
    }

    #[test]
    fn test_scaling_and_clamp() {
        let eff = params().effective(2.0).unwrap();
        assert_eq!(eff.edge_probs, vec![0.20, 0.80, 1.0]);
        assert_eq!(eff.fail_probs, vec![0.06, 0.24]);
        assert!(eff.edge_probs.iter().all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn test_identity_multiplier() {
        let p = params();
        let eff = p.effective(1.0).unwrap();
        assert_eq!(eff.edge_probs, p.edge_weights);
        assert_eq!(eff.fail_probs, p.base_fail_probs);
    }

    #[test]
    fn test_zero_multiplier_silences_everything() {
        let eff = params().effective(0.0).unwrap();
        assert!(eff.edge_probs.iter().all(|&p| p == 0.0));
        assert!(eff.fail_probs.iter().all(|&p| p == 0.0));
    }

    #[test]
    fn test_negative_multiplier_rejected() {
        let err = params().effective(-0.5).unwrap_err();
        assert_eq!(err, ConfigurationError::NegativeMultiplier(-0.5));
    }

    #[test]
    fn test_scenario_constructor_checks_sign() {
        assert!(StressScenario::new(StressLevel::High, 1.5).is_ok());
        assert!(StressScenario::new(StressLevel::Low, -1.0).is_err());
    }
}
