//! Feature standardization with fitted parameters
//!
//! Applies `(x - mean) / scale` per dimension using the statistics the models
//! were trained with. Files use `mean`/`scale` or scikit-learn's
//! `mean_`/`scale_` keys:
//!
//! ```json
//! {
//!   "feature_names": ["jitter", "shimmer", "hnr", "pitchVariation"],
//!   "mean": [0.0062, 0.041, 17.9, 0.094],
//!   "scale": [0.0031, 0.018, 4.6, 0.052]
//! }
//! ```

use crate::error::AnalysisError;
use crate::features::FeatureVector;
use serde::Deserialize;
use std::path::Path;

/// Fitted scaler parameters
///
/// Construction validates the parameters, so a `ScalerParameters` value is
/// always usable: equal non-zero lengths, finite values, no zero scale.
#[derive(Debug, Clone, PartialEq)]
pub struct ScalerParameters {
    mean: Vec<f64>,
    scale: Vec<f64>,
    feature_names: Option<Vec<String>>,
}

#[derive(Deserialize)]
struct ScalerFile {
    #[serde(alias = "mean_")]
    mean: Vec<f64>,
    #[serde(alias = "scale_")]
    scale: Vec<f64>,
    #[serde(default, alias = "feature_names_in_")]
    feature_names: Option<Vec<String>>,
}

impl ScalerParameters {
    /// Build validated parameters
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::Configuration` if the vectors are empty, differ
    /// in length, contain non-finite values, or any scale is zero.
    pub fn new(
        mean: Vec<f64>,
        scale: Vec<f64>,
        feature_names: Option<Vec<String>>,
    ) -> Result<Self, AnalysisError> {
        if mean.is_empty() {
            return Err(AnalysisError::Configuration(
                "Scaler has no dimensions".to_string(),
            ));
        }
        if mean.len() != scale.len() {
            return Err(AnalysisError::Configuration(format!(
                "Scaler mean has {} values but scale has {}",
                mean.len(),
                scale.len()
            )));
        }
        if let Some(names) = &feature_names {
            if names.len() != mean.len() {
                return Err(AnalysisError::Configuration(format!(
                    "Scaler lists {} feature names for {} dimensions",
                    names.len(),
                    mean.len()
                )));
            }
        }
        if let Some(i) = mean.iter().position(|m| !m.is_finite()) {
            return Err(AnalysisError::Configuration(format!(
                "Scaler mean[{}] is not finite",
                i
            )));
        }
        if let Some(i) = scale.iter().position(|s| !s.is_finite() || *s == 0.0) {
            return Err(AnalysisError::Configuration(format!(
                "Scaler scale[{}] is {}; must be finite and non-zero",
                i, scale[i]
            )));
        }

        Ok(Self {
            mean,
            scale,
            feature_names,
        })
    }

    /// Load parameters from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, AnalysisError> {
        let file: ScalerFile = super::read_artifact(path.as_ref(), "scaler")?;
        Self::new(file.mean, file.scale, file.feature_names)
    }

    /// Parse parameters from JSON text
    pub fn from_json(text: &str) -> Result<Self, AnalysisError> {
        let file: ScalerFile = serde_json::from_str(text)
            .map_err(|e| AnalysisError::Configuration(format!("invalid scaler: {}", e)))?;
        Self::new(file.mean, file.scale, file.feature_names)
    }

    /// Number of dimensions
    pub fn len(&self) -> usize {
        self.mean.len()
    }

    /// Always false for validated parameters
    pub fn is_empty(&self) -> bool {
        self.mean.is_empty()
    }

    /// Per-dimension means
    pub fn mean(&self) -> &[f64] {
        &self.mean
    }

    /// Per-dimension scales
    pub fn scale(&self) -> &[f64] {
        &self.scale
    }

    /// Feature names recorded at fit time, if any
    pub fn feature_names(&self) -> Option<&[String]> {
        self.feature_names.as_deref()
    }

    fn check_len(&self, len: usize) -> Result<(), AnalysisError> {
        if len != self.len() {
            return Err(AnalysisError::Configuration(format!(
                "Feature vector has {} dimensions but scaler expects {}",
                len,
                self.len()
            )));
        }
        Ok(())
    }

    /// Standardize a feature vector
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::Configuration` on a dimension mismatch.
    pub fn transform(&self, vector: &FeatureVector) -> Result<FeatureVector, AnalysisError> {
        self.check_len(vector.len())?;
        let values = vector
            .values()
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(x, (m, s))| (x - m) / s)
            .collect();
        FeatureVector::new(vector.layout(), values)
    }

    /// Map standardized values back to raw units
    pub fn inverse_transform(&self, vector: &FeatureVector) -> Result<FeatureVector, AnalysisError> {
        self.check_len(vector.len())?;
        let values = vector
            .values()
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(z, (m, s))| z * s + m)
            .collect();
        FeatureVector::new(vector.layout(), values)
    }
}

/// Standardize a raw feature vector with fitted parameters
pub fn normalize(
    vector: &FeatureVector,
    scaler: &ScalerParameters,
) -> Result<FeatureVector, AnalysisError> {
    log::debug!("Normalizing {} features", vector.len());
    scaler.transform(vector)
}
