//! # Stratum Voice
//!
//! Acoustic voice analysis for neurological voice disorder screening. A
//! recording is reduced to a small vector of voice biomarkers, standardized
//! against the training distribution, and scored by two independently trained
//! models whose probabilities are fused into one confidence and label.
//!
//! ## Features
//!
//! - **Decoding**: WAV, FLAC, MP3, OGG/Vorbis, AAC and more via symphonia,
//!   downmixed to mono
//! - **Biomarkers**: jitter, shimmer, harmonics-to-noise ratio and pitch
//!   variation (optionally mean pitch, voiced fraction and cepstral peak
//!   prominence) from McLeod pitch tracking and glottal pulse marking
//! - **Ensemble**: gradient-boosted trees and a densely connected 1-D CNN,
//!   fused `0.4 * A + 0.6 * B`; optional ONNX models behind the `onnx` feature
//!
//! ## Quick Start
//!
//! ```no_run
//! use stratum_voice::{AnalysisPipeline, DeploymentConfig};
//!
//! let deployment = DeploymentConfig::from_file("deploy/deployment.json")?;
//! let pipeline = AnalysisPipeline::from_deployment(&deployment)?;
//!
//! let bytes: Vec<u8> = vec![]; // Encoded audio
//! let result = pipeline.analyze(&bytes)?;
//!
//! println!("{:?} (fused confidence {:.2}%)", result.prediction, result.confidence.fused);
//! println!("jitter={} shimmer={} hnr={}", result.features.jitter, result.features.shimmer, result.features.hnr);
//! # Ok::<(), stratum_voice::AnalysisError>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Bytes → Decoding → Preprocessing → Biomarkers → Normalization → Ensemble → Result
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod analysis;
pub mod config;
pub mod error;
pub mod features;
pub mod io;
pub mod ml;
pub mod pipeline;
pub mod preprocessing;

// Re-export main types
pub use analysis::{AnalysisMetadata, AnalysisResponse, AnalysisResult, ConfidenceBreakdown};
pub use config::{AnalysisConfig, DeploymentConfig, ModelSource};
pub use error::AnalysisError;
pub use features::{Biomarker, BiomarkerLayout, FeatureVector};
pub use io::{decode_audio, AudioSample};
pub use ml::{Classification, EnsembleClassifier, FusionRule, Prediction, ScalerParameters, Scorer};
pub use pipeline::AnalysisPipeline;

/// Extract the biomarker vector from an encoded recording
///
/// Runs decoding and feature extraction only, without a scaler or models.
///
/// # Arguments
///
/// * `bytes` - Encoded audio (any container symphonia can probe)
/// * `config` - Analysis configuration parameters
///
/// # Errors
///
/// Returns `AnalysisError::Decode` or `AnalysisError::FeatureExtraction`.
///
/// # Example
///
/// ```no_run
/// use stratum_voice::{extract_biomarkers, AnalysisConfig};
///
/// let bytes = std::fs::read("sample.wav").unwrap_or_default();
/// let vector = extract_biomarkers(&bytes, &AnalysisConfig::default())?;
/// for (biomarker, value) in vector.iter() {
///     println!("{}: {}", biomarker.name(), value);
/// }
/// # Ok::<(), stratum_voice::AnalysisError>(())
/// ```
pub fn extract_biomarkers(
    bytes: &[u8],
    config: &AnalysisConfig,
) -> Result<FeatureVector, AnalysisError> {
    log::debug!("Extracting biomarkers from {} bytes", bytes.len());
    let sample = decode_audio(bytes)?;
    features::extract_features(&sample, config)
}
