//! Configuration parameters for voice analysis and deployment

use crate::error::AnalysisError;
use crate::features::BiomarkerLayout;
use crate::ml::FusionRule;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Analysis configuration parameters
///
/// Every field has a default, so a deployment file only needs to list the
/// values it overrides.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    // Preprocessing
    /// Recordings whose peak is below this level (dBFS) are rejected as silent (default: -60.0)
    pub silence_threshold_db: f32,

    /// Leading/trailing frames quieter than this (dB relative to the normalized peak)
    /// are trimmed, and frames below it are never voiced (default: -40.0)
    pub trim_threshold_db: f32,

    /// Minimum duration in milliseconds after trimming (default: 250.0)
    pub min_duration_ms: f32,

    // Pitch tracking
    /// Analysis frame length in milliseconds (default: 40.0)
    pub frame_ms: f32,

    /// Hop between frames in milliseconds (default: 10.0)
    pub hop_ms: f32,

    /// Lowest fundamental frequency considered voiced (default: 75.0 Hz)
    pub min_pitch_hz: f32,

    /// Highest fundamental frequency considered voiced (default: 500.0 Hz)
    pub max_pitch_hz: f32,

    /// McLeod clarity required to accept a pitch estimate (default: 0.6)
    pub clarity_threshold: f32,

    /// Minimum number of voiced frames for a valid analysis (default: 5)
    pub min_voiced_frames: usize,

    // Perturbation measures
    /// Largest ratio between adjacent periods still counted for jitter (default: 1.3)
    pub max_period_factor: f32,

    /// Largest ratio between adjacent peak amplitudes still counted for shimmer (default: 1.6)
    pub max_amplitude_factor: f32,

    // Output
    /// Biomarker layout; must match the fitted scaler and models (default: Core)
    pub layout: BiomarkerLayout,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            silence_threshold_db: -60.0,
            trim_threshold_db: -40.0,
            min_duration_ms: 250.0,
            frame_ms: 40.0,
            hop_ms: 10.0,
            min_pitch_hz: 75.0,
            max_pitch_hz: 500.0,
            clarity_threshold: 0.6,
            min_voiced_frames: 5,
            max_period_factor: 1.3,
            max_amplitude_factor: 1.6,
            layout: BiomarkerLayout::Core,
        }
    }
}

impl AnalysisConfig {
    /// Frame length in samples at the given rate
    pub fn frame_size(&self, sample_rate: u32) -> usize {
        ((self.frame_ms / 1000.0) * sample_rate as f32).round() as usize
    }

    /// Hop length in samples at the given rate (at least one sample)
    pub fn hop_size(&self, sample_rate: u32) -> usize {
        (((self.hop_ms / 1000.0) * sample_rate as f32).round() as usize).max(1)
    }

    /// Check parameter ranges
    pub fn validate(&self) -> Result<(), AnalysisError> {
        let positive = [
            ("frame_ms", self.frame_ms),
            ("hop_ms", self.hop_ms),
            ("min_pitch_hz", self.min_pitch_hz),
            ("max_pitch_hz", self.max_pitch_hz),
        ];
        for (name, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(AnalysisError::Configuration(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }
        if self.min_pitch_hz >= self.max_pitch_hz {
            return Err(AnalysisError::Configuration(format!(
                "min_pitch_hz ({}) must be below max_pitch_hz ({})",
                self.min_pitch_hz, self.max_pitch_hz
            )));
        }
        // A frame must hold at least two periods of the lowest pitch
        if self.frame_ms < 2000.0 / self.min_pitch_hz {
            return Err(AnalysisError::Configuration(format!(
                "frame_ms ({}) too short for min_pitch_hz ({})",
                self.frame_ms, self.min_pitch_hz
            )));
        }
        if !(0.0..=1.0).contains(&self.clarity_threshold) {
            return Err(AnalysisError::Configuration(format!(
                "clarity_threshold must be in [0, 1], got {}",
                self.clarity_threshold
            )));
        }
        if self.max_period_factor <= 1.0 || self.max_amplitude_factor <= 1.0 {
            return Err(AnalysisError::Configuration(
                "max_period_factor and max_amplitude_factor must exceed 1.0".to_string(),
            ));
        }
        if self.min_voiced_frames < 2 {
            return Err(AnalysisError::Configuration(
                "min_voiced_frames must be at least 2".to_string(),
            ));
        }
        Ok(())
    }
}

/// Where a scoring model comes from and how to load it
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(tag = "format", rename_all = "snake_case")]
pub enum ModelSource {
    /// Gradient-boosted tree ensemble in JSON
    TreeEnsemble {
        /// Artifact path
        path: PathBuf,
    },
    /// Densely connected 1-D convolutional network in JSON
    DenseConv {
        /// Artifact path
        path: PathBuf,
    },
    /// Exported ONNX graph (requires the `onnx` feature)
    Onnx {
        /// Model path
        path: PathBuf,
        /// Feed the vector as `[1, N, 1]` instead of `[1, N]`
        #[serde(default)]
        sequence_input: bool,
    },
}

impl ModelSource {
    /// Artifact path
    pub fn path(&self) -> &Path {
        match self {
            ModelSource::TreeEnsemble { path }
            | ModelSource::DenseConv { path }
            | ModelSource::Onnx { path, .. } => path,
        }
    }

    fn rebase(&mut self, base: &Path) {
        let path = match self {
            ModelSource::TreeEnsemble { path }
            | ModelSource::DenseConv { path }
            | ModelSource::Onnx { path, .. } => path,
        };
        if path.is_relative() {
            *path = base.join(&*path);
        }
    }
}

/// Everything a process needs to serve analyses, loaded once at startup
///
/// ```json
/// {
///   "scaler": "scaler.json",
///   "tree_model": { "format": "tree_ensemble", "path": "tree_ensemble.json" },
///   "sequence_model": { "format": "dense_conv", "path": "dense_conv.json" },
///   "fusion": { "tree_weight": 0.4, "sequence_weight": 0.6, "threshold": 0.5 },
///   "analysis": { "layout": "core" }
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct DeploymentConfig {
    /// Fitted scaler parameters (JSON)
    pub scaler: PathBuf,

    /// Model A, the tree-ensemble-style scorer
    pub tree_model: ModelSource,

    /// Model B, the sequence-model-style scorer
    pub sequence_model: ModelSource,

    /// Ensemble weights and decision threshold
    #[serde(default)]
    pub fusion: FusionRule,

    /// Feature extraction parameters
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

impl DeploymentConfig {
    /// Load a deployment file; relative artifact paths resolve against its directory
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, AnalysisError> {
        let path = path.as_ref();
        log::info!("Loading deployment configuration from {}", path.display());

        let text = std::fs::read_to_string(path).map_err(|e| {
            AnalysisError::Configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        let mut config = Self::from_json(&text)?;

        if let Some(base) = path.parent() {
            config.rebase(base);
        }
        Ok(config)
    }

    /// Parse a deployment description without touching the filesystem
    pub fn from_json(text: &str) -> Result<Self, AnalysisError> {
        let config: Self = serde_json::from_str(text)
            .map_err(|e| AnalysisError::Configuration(format!("invalid deployment file: {}", e)))?;
        config.analysis.validate()?;
        config.fusion.validate()?;
        Ok(config)
    }

    fn rebase(&mut self, base: &Path) {
        if self.scaler.is_relative() {
            self.scaler = base.join(&self.scaler);
        }
        self.tree_model.rebase(base);
        self.sequence_model.rebase(base);
    }
}
