use anyhow::{bail, Context};
use cascade_core::{ConfigurationError, StressLevel, StressScenario, F};
use serde::Serialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;

const LOW_PERCENTILE: F = 33.0;
const HIGH_PERCENTILE: F = 66.0;

/// Default series used when no index file is available.
const FALLBACK_VALUES: [F; 3] = [0.5, 1.0, 1.5];

/// Percentile boundaries of the historical index.
#[derive(Clone, Copy, Debug, Serialize)]
pub struct Thresholds {
    pub p33: F,
    pub p66: F,
    pub min: F,
    pub max: F,
    pub mean: F,
}

/// Historical stress-index model.
///
/// Splits the series into three regimes at the 33rd/66th percentiles; the
/// multiplier for a regime is the mean index value inside it. The core only
/// ever sees the resulting multipliers.
#[derive(Clone, Debug)]
pub struct StressIndexModel {
    n_values: usize,
    thresholds: Thresholds,
    low: F,
    medium: F,
    high: F,
}

impl StressIndexModel {
    /// Loads the index CSV (one `value` column). A missing file falls back
    /// to a neutral default series with a warning; a present-but-invalid
    /// file is an error.
    pub fn from_csv(path: &Path) -> anyhow::Result<Self> {
        match File::open(path) {
            Ok(file) => Self::from_reader(file),
            Err(_) => {
                tracing::warn!(?path, "stress index file not found, using default");
                Self::from_values(FALLBACK_VALUES.to_vec())
            }
        }
    }

    pub fn from_reader<R: Read>(reader: R) -> anyhow::Result<Self> {
        let mut csv = csv::Reader::from_reader(reader);
        let headers = csv.headers().context("reading stress index header")?;
        let col = headers
            .iter()
            .position(|h| h == "value")
            .context("stress index CSV must contain a 'value' column")?;

        let mut values = Vec::new();
        for record in csv.records() {
            let record = record.context("reading stress index row")?;
            // Blank and non-numeric cells are dropped, like NaN rows
            if let Ok(v) = record.get(col).unwrap_or("").trim().parse::<F>() {
                if v.is_finite() {
                    values.push(v);
                }
            }
        }
        Self::from_values(values)
    }

    pub fn from_values(values: Vec<F>) -> anyhow::Result<Self> {
        if values.is_empty() {
            bail!("stress index series is empty");
        }

        let mut sorted = values.clone();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());

        let p33 = percentile(&sorted, LOW_PERCENTILE);
        let p66 = percentile(&sorted, HIGH_PERCENTILE);
        let thresholds = Thresholds {
            p33,
            p66,
            min: sorted[0],
            max: sorted[sorted.len() - 1],
            mean: mean(&sorted),
        };

        let low_vals: Vec<F> = values.iter().copied().filter(|&v| v <= p33).collect();
        let mid_vals: Vec<F> = values
            .iter()
            .copied()
            .filter(|&v| v > p33 && v < p66)
            .collect();
        let high_vals: Vec<F> = values.iter().copied().filter(|&v| v >= p66).collect();

        let model = Self {
            n_values: values.len(),
            thresholds,
            low: if low_vals.is_empty() { 0.5 } else { mean(&low_vals) },
            medium: if mid_vals.is_empty() { 1.0 } else { mean(&mid_vals) },
            high: if high_vals.is_empty() { 1.5 } else { mean(&high_vals) },
        };
        tracing::info!(
            data_points = model.n_values,
            low = model.low,
            medium = model.medium,
            high = model.high,
            "stress multipliers computed"
        );
        Ok(model)
    }

    pub fn multiplier(&self, level: StressLevel) -> F {
        match level {
            StressLevel::Low => self.low,
            StressLevel::Medium => self.medium,
            StressLevel::High => self.high,
        }
    }

    /// The three scenarios this model supports, multiplier-checked.
    pub fn scenarios(&self) -> Result<Vec<StressScenario>, ConfigurationError> {
        StressLevel::all()
            .into_iter()
            .map(|level| StressScenario::new(level, self.multiplier(level)))
            .collect()
    }

    pub fn thresholds(&self) -> Thresholds {
        self.thresholds
    }

    pub fn n_values(&self) -> usize {
        self.n_values
    }
}

fn mean(values: &[F]) -> F {
    values.iter().sum::<F>() / values.len() as F
}

/// Percentile with linear interpolation between closest ranks, over a
/// pre-sorted slice.
fn percentile(sorted: &[F], p: F) -> F {
    if sorted.len() == 1 {
        return sorted[0];
    }
    let rank = p / 100.0 * (sorted.len() - 1) as F;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as F;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}
