//! Confidence reporting
//!
//! Converts model probabilities into the percentage breakdown returned to
//! callers. Percentages are `probability * 100` rounded to two decimals,
//! half away from zero.
//!
//! # Example
//!
//! ```
//! use stratum_voice::analysis::confidence::{round_to, to_percent};
//!
//! assert_eq!(to_percent(0.56), 56.0);
//! assert_eq!(round_to(0.123456, 4), 0.1235);
//! ```

use crate::ml::Classification;
use serde::{Deserialize, Serialize};

/// Decimal places of surfaced percentages
pub const PERCENT_DECIMALS: u32 = 2;

/// Round to `decimals` places, halves away from zero
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let factor = 10f64.powi(decimals as i32);
    (value * factor).round() / factor
}

/// Probability in [0, 1] to a rounded percentage in [0, 100]
pub fn to_percent(probability: f64) -> f64 {
    round_to(probability * 100.0, PERCENT_DECIMALS)
}

/// Per-model and fused confidence, in percent
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfidenceBreakdown {
    /// Tree ensemble (model A)
    pub model_a: f64,
    /// Sequence model (model B)
    pub model_b: f64,
    /// Weighted fusion
    pub fused: f64,
}

impl From<&Classification> for ConfidenceBreakdown {
    fn from(c: &Classification) -> Self {
        Self {
            model_a: to_percent(c.model_a),
            model_b: to_percent(c.model_b),
            fused: to_percent(c.fused),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::Prediction;

    #[test]
    fn test_round_half_away_from_zero() {
        assert_eq!(round_to(2.5, 0), 3.0);
        assert_eq!(round_to(-2.5, 0), -3.0);
        assert_eq!(round_to(18.245_000_1, 2), 18.25);
        assert_eq!(round_to(0.004_249, 4), 0.0042);
    }

    #[test]
    fn test_percent_bounds() {
        assert_eq!(to_percent(0.0), 0.0);
        assert_eq!(to_percent(1.0), 100.0);
        assert_eq!(to_percent(0.123_456), 12.35);
    }

    #[test]
    fn test_breakdown_from_classification() {
        let c = Classification {
            model_a: 0.2,
            model_b: 0.8,
            fused: 0.4 * 0.2 + 0.6 * 0.8,
            prediction: Prediction::Positive,
        };
        let breakdown = ConfidenceBreakdown::from(&c);
        assert_eq!(breakdown.model_a, 20.0);
        assert_eq!(breakdown.model_b, 80.0);
        assert_eq!(breakdown.fused, 56.0);
    }

    #[test]
    fn test_breakdown_json_keys() {
        let breakdown = ConfidenceBreakdown {
            model_a: 20.0,
            model_b: 80.0,
            fused: 56.0,
        };
        let json = serde_json::to_value(breakdown).unwrap();
        assert_eq!(json["modelA"], 20.0);
        assert_eq!(json["modelB"], 80.0);
        assert_eq!(json["fused"], 56.0);
    }
}
