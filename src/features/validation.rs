//! Biomarker sanity checks
//!
//! Non-finite values are errors. Finite values outside a biomarker's
//! plausible range are passed through unchanged and reported as warnings.

use super::{Biomarker, FeatureVector};
use crate::error::AnalysisError;
use std::fmt;

/// A biomarker value outside its plausible range
#[derive(Debug, Clone, PartialEq)]
pub struct DomainWarning {
    /// Biomarker concerned
    pub biomarker: Biomarker,
    /// Measured value (unchanged)
    pub value: f64,
    /// Plausible `(min, max)`
    pub expected: (f64, f64),
}

impl fmt::Display for DomainWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} = {:.4} outside plausible range [{}, {}]",
            self.biomarker.name(),
            self.value,
            self.expected.0,
            self.expected.1
        )
    }
}

/// Fail on NaN or infinite biomarkers
pub fn ensure_finite(vector: &FeatureVector) -> Result<(), AnalysisError> {
    for (biomarker, value) in vector.iter() {
        if !value.is_finite() {
            return Err(AnalysisError::FeatureExtraction(format!(
                "{} is not finite ({})",
                biomarker.name(),
                value
            )));
        }
    }
    Ok(())
}

/// Flag biomarkers outside their plausible ranges
pub fn check_domains(vector: &FeatureVector) -> Vec<DomainWarning> {
    vector
        .iter()
        .filter_map(|(biomarker, value)| {
            let (min, max) = biomarker.plausible_range();
            if value < min || value > max {
                Some(DomainWarning {
                    biomarker,
                    value,
                    expected: (min, max),
                })
            } else {
                None
            }
        })
        .collect()
}
