//! End-to-end analysis pipeline
//!
//! Decode → extract biomarkers → normalize → classify → assemble the result.
//! A pipeline holds only immutable, validated state, so one instance serves
//! any number of concurrent requests.
//!
//! # Example
//!
//! ```no_run
//! use stratum_voice::{AnalysisPipeline, DeploymentConfig};
//!
//! let deployment = DeploymentConfig::from_file("deploy/deployment.json")?;
//! let pipeline = AnalysisPipeline::from_deployment(&deployment)?;
//!
//! let bytes = std::fs::read("sample.wav").expect("read sample");
//! let response = pipeline.handle(&bytes);
//! println!("{} {}", response.status_code(), response.to_json());
//! # Ok::<(), stratum_voice::AnalysisError>(())
//! ```

use crate::analysis::confidence::ConfidenceBreakdown;
use crate::analysis::metadata::AnalysisMetadata;
use crate::analysis::result::{AnalysisResponse, AnalysisResult, SurfacedFeatures, SUCCESS_MESSAGE};
use crate::config::{AnalysisConfig, DeploymentConfig, ModelSource};
use crate::error::AnalysisError;
use crate::features::analyze_voice;
use crate::io::decode_audio;
use crate::ml::{normalize, DenseConvNet, EnsembleClassifier, ScalerParameters, Scorer, TreeEnsemble};
use chrono::Utc;
use std::time::Instant;

/// Validated scaler, models and analysis parameters
#[derive(Debug)]
pub struct AnalysisPipeline {
    config: AnalysisConfig,
    scaler: ScalerParameters,
    ensemble: EnsembleClassifier,
}

impl AnalysisPipeline {
    /// Assemble a pipeline from loaded parts
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::Configuration` if the analysis parameters are
    /// invalid, or if the layout, the scaler and either model disagree on the
    /// feature vector length (or, when the scaler records them, on the
    /// feature names).
    pub fn new(
        config: AnalysisConfig,
        scaler: ScalerParameters,
        ensemble: EnsembleClassifier,
    ) -> Result<Self, AnalysisError> {
        config.validate()?;
        let layout = config.layout;

        if scaler.len() != layout.len() {
            return Err(AnalysisError::Configuration(format!(
                "Scaler has {} dimensions but the {:?} layout produces {}",
                scaler.len(),
                layout,
                layout.len()
            )));
        }

        if let Some(names) = scaler.feature_names() {
            let expected = layout.names();
            if names.iter().map(String::as_str).ne(expected.iter().copied()) {
                return Err(AnalysisError::Configuration(format!(
                    "Scaler was fitted on {:?}, layout produces {:?}",
                    names, expected
                )));
            }
        }

        for scorer in [ensemble.tree_model(), ensemble.sequence_model()] {
            if let Some(len) = scorer.input_len() {
                if len != layout.len() {
                    return Err(AnalysisError::Configuration(format!(
                        "{} expects {} inputs but the {:?} layout produces {}",
                        scorer.name(),
                        len,
                        layout,
                        layout.len()
                    )));
                }
            }
        }

        log::info!(
            "Pipeline ready: {:?} layout ({} features), {} + {}, weights {}/{}, threshold {}",
            layout,
            layout.len(),
            ensemble.tree_model().name(),
            ensemble.sequence_model().name(),
            ensemble.rule().tree_weight,
            ensemble.rule().sequence_weight,
            ensemble.rule().threshold
        );

        Ok(Self {
            config,
            scaler,
            ensemble,
        })
    }

    /// Load every artifact named by a deployment description
    pub fn from_deployment(deployment: &DeploymentConfig) -> Result<Self, AnalysisError> {
        let scaler = ScalerParameters::from_file(&deployment.scaler)?;
        let tree = load_scorer(&deployment.tree_model)?;
        let sequence = load_scorer(&deployment.sequence_model)?;
        let ensemble = EnsembleClassifier::new(tree, sequence, deployment.fusion.clone())?;
        Self::new(deployment.analysis.clone(), scaler, ensemble)
    }

    /// Analysis parameters
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Fitted scaler
    pub fn scaler(&self) -> &ScalerParameters {
        &self.scaler
    }

    /// Model ensemble
    pub fn ensemble(&self) -> &EnsembleClassifier {
        &self.ensemble
    }

    /// Analyze one encoded recording
    ///
    /// # Errors
    ///
    /// Any stage's error is returned unchanged: `Decode`, `FeatureExtraction`,
    /// `Configuration` (dimension mismatch) or `ModelInference`.
    pub fn analyze(&self, bytes: &[u8]) -> Result<AnalysisResult, AnalysisError> {
        let timestamp = Utc::now();
        let start_time = Instant::now();

        log::debug!("Starting analysis of {} bytes", bytes.len());

        let sample = decode_audio(bytes)?;
        let voice = analyze_voice(&sample, &self.config)?;
        let scaled = normalize(&voice.vector, &self.scaler)?;
        let classification = self.ensemble.classify(&scaled)?;

        let processing_time_ms = start_time.elapsed().as_secs_f32() * 1000.0;
        log::debug!(
            "Analysis complete in {:.1} ms: {:?} (fused {:.4})",
            processing_time_ms,
            classification.prediction,
            classification.fused
        );

        Ok(AnalysisResult {
            timestamp,
            prediction: classification.prediction,
            confidence: ConfidenceBreakdown::from(&classification),
            features: SurfacedFeatures::from_vector(&voice.vector),
            message: SUCCESS_MESSAGE.to_string(),
            metadata: AnalysisMetadata {
                duration_seconds: sample.duration_seconds(),
                analysed_seconds: voice.analysed_seconds,
                sample_rate: sample.sample_rate(),
                processing_time_ms,
                voiced_frames: voice.voiced_frames,
                total_frames: voice.total_frames,
                glottal_cycles: voice.glottal_cycles,
                input_peak_db: voice.loudness.peak_db,
                input_rms_db: voice.loudness.rms_db,
                normalization_gain_db: voice.loudness.gain_db,
                period_pairs: voice.perturbation.period_pairs,
                amplitude_pairs: voice.perturbation.amplitude_pairs,
                mean_period_ms: voice.perturbation.mean_period_s * 1000.0,
                domain_warnings: voice.warnings.iter().map(|w| w.to_string()).collect(),
                ..Default::default()
            },
        })
    }

    /// Analyze and map any failure to the uniform error response
    pub fn handle(&self, bytes: &[u8]) -> AnalysisResponse {
        let outcome = self.analyze(bytes);
        if let Err(e) = &outcome {
            log::warn!("Analysis failed ({}): {}", e.kind(), e);
        }
        outcome.into()
    }
}

/// Load one scorer from its source description
pub fn load_scorer(source: &ModelSource) -> Result<Box<dyn Scorer>, AnalysisError> {
    match source {
        ModelSource::TreeEnsemble { path } => Ok(Box::new(TreeEnsemble::from_file(path)?)),
        ModelSource::DenseConv { path } => Ok(Box::new(DenseConvNet::from_file(path)?)),
        #[cfg(feature = "onnx")]
        ModelSource::Onnx {
            path,
            sequence_input,
        } => Ok(Box::new(crate::ml::onnx_model::OnnxModel::load(
            path,
            *sequence_input,
        )?)),
        #[cfg(not(feature = "onnx"))]
        ModelSource::Onnx { path, .. } => Err(AnalysisError::Configuration(format!(
            "{} is an ONNX model; rebuild with the `onnx` feature",
            path.display()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::BiomarkerLayout;
    use crate::ml::ensemble::test_scorers::Fixed;
    use crate::ml::FusionRule;

    fn core_scaler() -> ScalerParameters {
        ScalerParameters::new(vec![0.0; 4], vec![1.0; 4], None).unwrap()
    }

    fn fixed_ensemble(a: f64, b: f64) -> EnsembleClassifier {
        EnsembleClassifier::new(Box::new(Fixed(a)), Box::new(Fixed(b)), FusionRule::default())
            .unwrap()
    }

    #[test]
    fn test_pipeline_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AnalysisPipeline>();
    }

    #[test]
    fn test_scaler_layout_mismatch() {
        let scaler = ScalerParameters::new(vec![0.0; 7], vec![1.0; 7], None).unwrap();
        let result = AnalysisPipeline::new(AnalysisConfig::default(), scaler, fixed_ensemble(0.1, 0.1));
        assert!(matches!(result, Err(AnalysisError::Configuration(_))));
    }

    #[test]
    fn test_scaler_feature_names_must_match_layout() {
        let names = ["jitter", "shimmer", "pitchVariation", "hnr"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let scaler = ScalerParameters::new(vec![0.0; 4], vec![1.0; 4], Some(names)).unwrap();
        assert!(
            AnalysisPipeline::new(AnalysisConfig::default(), scaler, fixed_ensemble(0.1, 0.1))
                .is_err()
        );
    }

    #[test]
    fn test_model_input_length_checked() {
        let tree = TreeEnsemble::new(7, 0.0, Vec::new()).unwrap();
        let ensemble =
            EnsembleClassifier::new(Box::new(tree), Box::new(Fixed(0.5)), FusionRule::default())
                .unwrap();
        let result = AnalysisPipeline::new(AnalysisConfig::default(), core_scaler(), ensemble);
        assert!(matches!(result, Err(AnalysisError::Configuration(_))));
    }

    #[test]
    fn test_extended_layout_accepted_with_matching_parts() {
        let config = AnalysisConfig {
            layout: BiomarkerLayout::Extended,
            ..Default::default()
        };
        let scaler = ScalerParameters::new(vec![0.0; 7], vec![1.0; 7], None).unwrap();
        assert!(AnalysisPipeline::new(config, scaler, fixed_ensemble(0.2, 0.2)).is_ok());
    }

    #[test]
    fn test_empty_bytes_fail_with_decode_error() {
        let pipeline =
            AnalysisPipeline::new(AnalysisConfig::default(), core_scaler(), fixed_ensemble(0.2, 0.8))
                .unwrap();
        assert!(matches!(pipeline.analyze(&[]), Err(AnalysisError::Decode(_))));

        let response = pipeline.handle(&[]);
        assert_eq!(response.status_code(), 500);
        assert!(response.to_json().contains("\"error\""));
    }

    #[cfg(not(feature = "onnx"))]
    #[test]
    fn test_onnx_source_needs_feature() {
        let source = ModelSource::Onnx {
            path: "model.onnx".into(),
            sequence_input: false,
        };
        assert!(matches!(load_scorer(&source), Err(AnalysisError::Configuration(_))));
    }
}
