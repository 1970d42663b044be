//! Normalization and classification
//!
//! - [`scaler`]: fitted per-dimension standardization
//! - [`tree_ensemble`]: gradient-boosted tree scorer (model A)
//! - [`sequence`]: densely connected 1-D CNN scorer (model B)
//! - [`ensemble`]: weighted fusion of both scores
//! - `onnx_model`: either role served by an ONNX graph (feature `onnx`)

pub mod ensemble;
pub mod scaler;
pub mod sequence;
pub mod tree_ensemble;

#[cfg(feature = "onnx")]
pub mod onnx_model;

pub use ensemble::{Classification, EnsembleClassifier, FusionRule, Prediction};
pub use scaler::{normalize, ScalerParameters};
pub use sequence::DenseConvNet;
pub use tree_ensemble::TreeEnsemble;

use crate::error::AnalysisError;

/// A trained model mapping a scaled feature vector to a probability
///
/// Implementations are immutable after loading and take `&self`, so one
/// instance can score requests from many threads.
pub trait Scorer: Send + Sync {
    /// Short name used in logs and error messages
    fn name(&self) -> &str;

    /// Input length the model was trained on, if it declares one
    fn input_len(&self) -> Option<usize> {
        None
    }

    /// Probability of the positive class, expected in [0, 1]
    fn score(&self, features: &[f64]) -> Result<f64, AnalysisError>;
}

/// Logistic function
pub(crate) fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

/// Read and parse a JSON model artifact
pub(crate) fn read_artifact<T: serde::de::DeserializeOwned>(
    path: &std::path::Path,
    what: &str,
) -> Result<T, AnalysisError> {
    log::info!("Loading {} from {}", what, path.display());
    let text = std::fs::read_to_string(path).map_err(|e| {
        AnalysisError::Configuration(format!("cannot read {} {}: {}", what, path.display(), e))
    })?;
    serde_json::from_str(&text).map_err(|e| {
        AnalysisError::Configuration(format!("invalid {} {}: {}", what, path.display(), e))
    })
}
