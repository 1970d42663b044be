//! Analysis metadata structures

use serde::{Deserialize, Serialize};

/// Diagnostics attached to a result (not part of the response body)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisMetadata {
    /// Decoded duration in seconds
    pub duration_seconds: f32,

    /// Duration left after trimming silence, in seconds
    pub analysed_seconds: f32,

    /// Sample rate in Hz
    pub sample_rate: u32,

    /// Wall time spent in the pipeline, in milliseconds
    pub processing_time_ms: f32,

    /// Crate version that produced the result
    pub algorithm_version: String,

    /// Voiced analysis frames
    pub voiced_frames: usize,

    /// All analysis frames
    pub total_frames: usize,

    /// Glottal cycles used for perturbation measures
    pub glottal_cycles: usize,

    /// Peak level of the decoded input, in dBFS
    pub input_peak_db: f32,

    /// RMS level of the decoded input, in dBFS
    pub input_rms_db: f32,

    /// Gain applied by peak normalization, in dB
    pub normalization_gain_db: f32,

    /// Consecutive period pairs behind the jitter value
    pub period_pairs: usize,

    /// Consecutive amplitude pairs behind the shimmer value
    pub amplitude_pairs: usize,

    /// Mean glottal period, in milliseconds
    pub mean_period_ms: f64,

    /// Biomarkers outside their plausible range
    pub domain_warnings: Vec<String>,
}

impl Default for AnalysisMetadata {
    fn default() -> Self {
        Self {
            duration_seconds: 0.0,
            analysed_seconds: 0.0,
            sample_rate: 0,
            processing_time_ms: 0.0,
            algorithm_version: env!("CARGO_PKG_VERSION").to_string(),
            voiced_frames: 0,
            total_frames: 0,
            glottal_cycles: 0,
            input_peak_db: f32::NEG_INFINITY,
            input_rms_db: f32::NEG_INFINITY,
            normalization_gain_db: 0.0,
            period_pairs: 0,
            amplitude_pairs: 0,
            mean_period_ms: 0.0,
            domain_warnings: vec![],
        }
    }
}
