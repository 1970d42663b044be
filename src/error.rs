//! Error types for the voice analysis pipeline

use thiserror::Error;

/// Errors that can occur while loading artifacts or analyzing a recording
///
/// Every stage of the pipeline reports failures through one of these four
/// kinds. None of them is transient, so nothing is retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AnalysisError {
    /// The byte buffer is empty, truncated or not a recognized audio encoding
    #[error("Decoding error: {0}")]
    Decode(String),

    /// The recording is too short, silent or unvoiced to compute a biomarker
    #[error("Feature extraction error: {0}")]
    FeatureExtraction(String),

    /// Scaler/model dimensionality mismatch, invalid scale, bad fusion weights
    /// or an unreadable artifact. Raised while loading, before serving.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A scorer failed or returned a probability outside [0, 1]
    #[error("Model inference error: {0}")]
    ModelInference(String),
}

impl AnalysisError {
    /// Short machine-readable name of the error kind
    pub fn kind(&self) -> &'static str {
        match self {
            AnalysisError::Decode(_) => "decode",
            AnalysisError::FeatureExtraction(_) => "feature_extraction",
            AnalysisError::Configuration(_) => "configuration",
            AnalysisError::ModelInference(_) => "model_inference",
        }
    }

    /// Whether this error should stop a service from accepting traffic
    pub fn is_startup_fatal(&self) -> bool {
        matches!(self, AnalysisError::Configuration(_))
    }
}
