//! Peak normalization
//!
//! Voice recordings arrive at arbitrary gain. All biomarkers are ratios, so
//! scaling does not change them, but the pitch tracker and the silence gates
//! work on absolute levels; normalizing first makes those thresholds relative
//! to the recording's own peak.
//!
//! # Example
//!
//! ```
//! use stratum_voice::preprocessing::normalization::normalize_peak;
//!
//! let mut samples = vec![0.1f32, -0.25, 0.2];
//! let metadata = normalize_peak(&mut samples, 1.0)?;
//! assert!(metadata.gain_db > 0.0);
//! # Ok::<(), stratum_voice::AnalysisError>(())
//! ```

use crate::error::AnalysisError;

/// Numerical stability epsilon for divisions
const EPSILON: f32 = 1e-10;

/// Level metadata returned from normalization
#[derive(Debug, Clone, PartialEq)]
pub struct LoudnessMetadata {
    /// Peak level in dBFS (before normalization)
    pub peak_db: f32,
    /// RMS level in dBFS (before normalization)
    pub rms_db: f32,
    /// Gain applied in dB
    pub gain_db: f32,
}

impl Default for LoudnessMetadata {
    fn default() -> Self {
        Self {
            peak_db: f32::NEG_INFINITY,
            rms_db: f32::NEG_INFINITY,
            gain_db: 0.0,
        }
    }
}

/// Convert a linear amplitude to dBFS
pub fn amplitude_to_db(amplitude: f32) -> f32 {
    if amplitude > EPSILON {
        20.0 * amplitude.log10()
    } else {
        f32::NEG_INFINITY
    }
}

/// Convert dBFS to a linear amplitude
pub fn db_to_amplitude(db: f32) -> f32 {
    10.0_f32.powf(db / 20.0)
}

/// Peak level of a signal in dBFS
pub fn peak_db(samples: &[f32]) -> f32 {
    amplitude_to_db(samples.iter().map(|&x| x.abs()).fold(0.0f32, f32::max))
}

/// Scale samples so the peak sits `max_headroom_db` below full scale
///
/// # Arguments
///
/// * `samples` - Audio samples, modified in place
/// * `max_headroom_db` - Headroom below 0 dBFS for the normalized peak
///
/// # Returns
///
/// Levels measured before normalization and the gain applied. Silent input is
/// left untouched and reported with `gain_db == 0.0`.
///
/// # Errors
///
/// Returns `AnalysisError::FeatureExtraction` if `samples` is empty.
pub fn normalize_peak(
    samples: &mut [f32],
    max_headroom_db: f32,
) -> Result<LoudnessMetadata, AnalysisError> {
    if samples.is_empty() {
        return Err(AnalysisError::FeatureExtraction(
            "Empty audio samples".to_string(),
        ));
    }

    let peak = samples.iter().map(|&x| x.abs()).fold(0.0f32, f32::max);

    if peak <= EPSILON {
        log::warn!("Audio is silent or extremely quiet, cannot normalize");
        return Ok(LoudnessMetadata::default());
    }

    let rms = (samples.iter().map(|&x| x * x).sum::<f32>() / samples.len() as f32).sqrt();
    let peak_db = amplitude_to_db(peak);
    let rms_db = amplitude_to_db(rms);

    let target_peak_linear = db_to_amplitude(-max_headroom_db.abs());
    let gain_linear = target_peak_linear / peak;
    let gain_db = amplitude_to_db(gain_linear);

    for sample in samples.iter_mut() {
        *sample *= gain_linear;
    }

    log::debug!(
        "Peak normalization: peak={:.2} dB, rms={:.2} dB, gain={:.2} dB",
        peak_db,
        rms_db,
        gain_db
    );

    Ok(LoudnessMetadata {
        peak_db,
        rms_db,
        gain_db,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn generate_test_signal(length: usize, amplitude: f32, sample_rate: f32) -> Vec<f32> {
        (0..length)
            .map(|i| {
                let t = i as f32 / sample_rate;
                amplitude * (2.0 * std::f32::consts::PI * 220.0 * t).sin()
            })
            .collect()
    }

    #[test]
    fn test_peak_normalization() {
        let mut samples = generate_test_signal(16000, 0.1, 16000.0);

        let metadata = normalize_peak(&mut samples, 1.0).unwrap();

        let peak = samples.iter().map(|&x| x.abs()).fold(0.0f32, f32::max);
        let expected = db_to_amplitude(-1.0);
        assert!(
            (peak - expected).abs() < 1e-3,
            "Peak normalization failed: expected {:.4}, got {:.4}",
            expected,
            peak
        );
        assert!((metadata.peak_db - (-20.0)).abs() < 0.1);
        assert!(metadata.gain_db > 18.0 && metadata.gain_db < 20.0);
    }

    #[test]
    fn test_loud_signal_attenuated() {
        let mut samples = generate_test_signal(16000, 1.0, 16000.0);
        let metadata = normalize_peak(&mut samples, 3.0).unwrap();
        assert!(metadata.gain_db < 0.0);
        assert!(samples.iter().all(|&x| x.abs() <= 1.0));
    }

    #[test]
    fn test_silent_audio() {
        let mut samples = vec![0.0f32; 16000];
        let metadata = normalize_peak(&mut samples, 1.0).unwrap();
        assert_eq!(metadata.gain_db, 0.0, "Silent audio should not apply gain");
        assert_eq!(metadata.peak_db, f32::NEG_INFINITY);
        assert!(samples.iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_empty_samples() {
        let mut samples: Vec<f32> = vec![];
        assert!(normalize_peak(&mut samples, 1.0).is_err());
    }

    #[test]
    fn test_db_conversions() {
        assert!((amplitude_to_db(1.0)).abs() < 1e-6);
        assert!((amplitude_to_db(0.1) + 20.0).abs() < 1e-4);
        assert!((db_to_amplitude(-6.0) - 0.501).abs() < 1e-3);
        assert_eq!(peak_db(&[0.0, 0.0]), f32::NEG_INFINITY);
    }
}
