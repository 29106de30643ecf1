//! Multiplier growth per running tick
//!
//! Growth accelerates with the multiplier: `increment(m)` is positive for
//! every `m >= 1` and non-decreasing in `m`, giving the slow start and fast
//! climb players expect.

use crate::common::types::{round_cents, CENT};
use serde::{Deserialize, Serialize};

/// Increment applied from `from` upwards
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GrowthBand {
    pub from: f64,
    pub increment: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GrowthCurve {
    /// `increment(m) = m * rate`
    Exponential { rate: f64 },
    /// Piecewise-constant increments keyed by multiplier threshold
    Stepped { bands: Vec<GrowthBand> },
}

impl Default for GrowthCurve {
    fn default() -> Self {
        GrowthCurve::Exponential { rate: 0.006 }
    }
}

impl GrowthCurve {
    /// 0.02 below 5x, then 0.05, 0.1 and 0.2 past 10x and 20x
    pub fn classic_bands() -> Self {
        GrowthCurve::Stepped {
            bands: vec![
                GrowthBand { from: 1.0, increment: 0.02 },
                GrowthBand { from: 5.0, increment: 0.05 },
                GrowthBand { from: 10.0, increment: 0.1 },
                GrowthBand { from: 20.0, increment: 0.2 },
            ],
        }
    }

    /// Raw increment at multiplier `m`
    pub fn increment(&self, multiplier: f64) -> f64 {
        match self {
            GrowthCurve::Exponential { rate } => multiplier * rate,
            GrowthCurve::Stepped { bands } => bands
                .iter()
                .take_while(|band| band.from <= multiplier)
                .last()
                .or_else(|| bands.first())
                .map(|band| band.increment)
                .unwrap_or(CENT),
        }
    }

    /// Next multiplier on the cent grid, always at least one cent higher
    pub fn advance(&self, multiplier: f64) -> f64 {
        let next = round_cents(multiplier + self.increment(multiplier));
        next.max(round_cents(multiplier + CENT))
    }

    /// Describe why the curve breaks the growth contract, if it does
    pub fn check(&self) -> Result<(), String> {
        match self {
            GrowthCurve::Exponential { rate } => {
                if !rate.is_finite() || *rate <= 0.0 {
                    return Err(format!("exponential rate must be > 0, got {}", rate));
                }
            }
            GrowthCurve::Stepped { bands } => {
                let first = bands
                    .first()
                    .ok_or_else(|| "stepped growth needs at least one band".to_string())?;
                if first.from > 1.0 {
                    return Err(format!("first band must start at or below 1.0, got {}", first.from));
                }
                for band in bands {
                    if !band.increment.is_finite() || band.increment <= 0.0 {
                        return Err(format!("band increments must be > 0, got {}", band.increment));
                    }
                }
                for pair in bands.windows(2) {
                    if pair[1].from <= pair[0].from {
                        return Err("band thresholds must be strictly ascending".to_string());
                    }
                    if pair[1].increment < pair[0].increment {
                        return Err("band increments must not decrease".to_string());
                    }
                }
            }
        }
        Ok(())
    }
}
