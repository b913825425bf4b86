//! Post-hoc adjustment of raw model output
//!
//! Raw predictions are scaled by a global growth factor, then specific hours
//! get a multiplicative discount. Rules are checked in order and the first
//! rule listing the hour wins.

use serde::{Deserialize, Serialize};

/// Multiplier applied to a set of hours
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourlyDiscount {
    pub hours: Vec<u32>,
    pub factor: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdjustmentPolicy {
    pub growth_rate: f64,
    pub rules: Vec<HourlyDiscount>,
}

impl Default for AdjustmentPolicy {
    fn default() -> Self {
        Self {
            growth_rate: 0.08,
            rules: vec![
                HourlyDiscount {
                    hours: vec![17],
                    factor: 0.97,
                },
                HourlyDiscount {
                    hours: vec![8, 9, 10, 11, 12, 13, 14, 18],
                    factor: 0.91,
                },
            ],
        }
    }
}

impl AdjustmentPolicy {
    /// Discount factor for an hour, 1.0 when no rule matches
    pub fn hour_factor(&self, hour: u32) -> f64 {
        self.rules
            .iter()
            .find(|r| r.hours.contains(&hour))
            .map_or(1.0, |r| r.factor)
    }

    /// Adjust raw predictions; index i is hour i
    pub fn apply(&self, raw: &[f64]) -> Vec<f64> {
        let growth = 1.0 + self.growth_rate;
        raw.iter()
            .enumerate()
            .map(|(hour, value)| value * growth * self.hour_factor(hour as u32))
            .collect()
    }
}
