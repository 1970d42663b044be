//! Harmonics-to-noise ratio
//!
//! # Algorithm
//!
//! For every voiced frame:
//! 1. Remove the frame mean
//! 2. Autocorrelate via FFT (zero-padded to avoid circular wrap)
//! 3. Normalize each lag by the energies of the two overlapping segments, so
//!    a perfectly periodic frame reaches 1.0 at its period
//! 4. Take the peak within ±10% of the tracked period, refined with
//!    parabolic interpolation
//! 5. HNR = 10·log10(r / (1 - r))
//!
//! The recording's HNR is the mean over frames with a positive peak.
//!
//! # Reference
//!
//! Boersma, P. (1993). Accurate short-term analysis of the fundamental
//! frequency and the harmonics-to-noise ratio of a sampled sound.
//! *Proceedings of the Institute of Phonetic Sciences*, 17, 97-110.

use super::pitch::PitchTrack;
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

/// Relative width of the lag search window around the tracked period
const LAG_TOLERANCE: f64 = 0.1;

/// Upper bound on the normalized autocorrelation, caps HNR near 60 dB
const MAX_CORRELATION: f64 = 1.0 - 1e-6;

/// Harmonics-to-noise ratio (dB) averaged over voiced frames
///
/// # Errors
///
/// Returns `AnalysisError::FeatureExtraction` if no voiced frame has a
/// positive autocorrelation peak near its period.
pub fn harmonics_to_noise(
    samples: &[f32],
    track: &PitchTrack,
    config: &AnalysisConfig,
) -> Result<f64, AnalysisError> {
    let frame_size = track.frame_size;
    let fft_size = (2 * frame_size).next_power_of_two();
    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(fft_size);
    let ifft = planner.plan_fft_inverse(fft_size);

    let sample_rate = track.sample_rate as f64;
    let min_lag = sample_rate / config.max_pitch_hz as f64;
    let max_lag = sample_rate / config.min_pitch_hz as f64;

    let mut total = 0.0;
    let mut counted = 0usize;

    for frame in &track.frames {
        let end = frame.start + frame_size;
        if end > samples.len() {
            continue;
        }
        let period = sample_rate / frame.frequency as f64;
        let low = (period * (1.0 - LAG_TOLERANCE)).max(min_lag).floor() as usize;
        let high = (period * (1.0 + LAG_TOLERANCE))
            .min(max_lag)
            .ceil()
            .min((frame_size / 2) as f64) as usize;
        if low < 1 || high <= low {
            continue;
        }

        let correlation = normalized_autocorrelation(&samples[frame.start..end], &fft, &ifft);
        if let Some(r) = peak_correlation(&correlation, low, high) {
            if r > 0.0 {
                let r = r.min(MAX_CORRELATION);
                total += 10.0 * (r / (1.0 - r)).log10();
                counted += 1;
            }
        }
    }

    if counted == 0 {
        return Err(AnalysisError::FeatureExtraction(
            "Cannot measure HNR: no periodic frames".to_string(),
        ));
    }

    let hnr = total / counted as f64;
    log::debug!("HNR: {:.2} dB over {} frames", hnr, counted);
    Ok(hnr)
}

/// Energy-normalized autocorrelation of a frame for lags `0..len/2`
fn normalized_autocorrelation(
    frame: &[f32],
    fft: &Arc<dyn Fft<f64>>,
    ifft: &Arc<dyn Fft<f64>>,
) -> Vec<f64> {
    let n = frame.len();
    let fft_size = fft.len();
    let mean = frame.iter().map(|&x| x as f64).sum::<f64>() / n as f64;
    let centered: Vec<f64> = frame.iter().map(|&x| x as f64 - mean).collect();

    let mut buffer: Vec<Complex<f64>> = centered.iter().map(|&x| Complex::new(x, 0.0)).collect();
    buffer.resize(fft_size, Complex::new(0.0, 0.0));
    fft.process(&mut buffer);
    for x in &mut buffer {
        *x = *x * x.conj();
    }
    ifft.process(&mut buffer);
    let scale = 1.0 / fft_size as f64;

    // prefix[i] = energy of centered[..i]
    let mut prefix = Vec::with_capacity(n + 1);
    prefix.push(0.0);
    for &x in &centered {
        let last = prefix[prefix.len() - 1];
        prefix.push(last + x * x);
    }
    let total = prefix[n];

    (0..n / 2)
        .map(|lag| {
            let head = prefix[n - lag];
            let tail = total - prefix[lag];
            let denom = (head * tail).sqrt();
            if denom <= f64::EPSILON {
                0.0
            } else {
                buffer[lag].re * scale / denom
            }
        })
        .collect()
}

/// Largest interpolated peak of `correlation` in `[low, high]`
fn peak_correlation(correlation: &[f64], low: usize, high: usize) -> Option<f64> {
    let high = high.min(correlation.len().saturating_sub(1));
    if high <= low {
        return None;
    }
    let (index, &value) = correlation[low..=high]
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(i, v)| (low + i, v))?;

    if index == 0 || index + 1 >= correlation.len() {
        return Some(value);
    }
    let (y0, y1, y2) = (correlation[index - 1], value, correlation[index + 1]);
    let denom = y0 - 2.0 * y1 + y2;
    if denom >= 0.0 {
        // Not a local maximum (window edge); keep the sampled value
        return Some(value);
    }
    let offset = (0.5 * (y0 - y2) / denom).clamp(-0.5, 0.5);
    Some(y1 - 0.25 * (y0 - y2) * offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::pitch::track_pitch;
    use crate::features::test_signals::*;

    fn hnr_of(samples: &[f32]) -> Result<f64, AnalysisError> {
        let config = AnalysisConfig::default();
        let track = track_pitch(samples, 16000, &config)?;
        harmonics_to_noise(samples, &track, &config)
    }

    #[test]
    fn test_clean_tone_has_high_hnr() {
        let hnr = hnr_of(&vowel(200.0, 16000, 600)).unwrap();
        assert!(hnr > 25.0, "hnr {}", hnr);
    }

    #[test]
    fn test_hnr_falls_with_noise_level() {
        let tone = vowel(150.0, 16000, 800);
        let light = hnr_of(&mix(&tone, &noise(tone.len(), 0.05, 1))).unwrap();
        let heavy = hnr_of(&mix(&tone, &noise(tone.len(), 0.25, 1))).unwrap();
        assert!(light > heavy + 5.0, "light {} heavy {}", light, heavy);
        assert!(heavy > 0.0 && heavy < 20.0, "heavy {}", heavy);
    }

    #[test]
    fn test_normalized_autocorrelation_starts_at_one() {
        let frame = vowel(200.0, 16000, 40);
        let mut planner = FftPlanner::<f64>::new();
        let size = (2 * frame.len()).next_power_of_two();
        let fft = planner.plan_fft_forward(size);
        let ifft = planner.plan_fft_inverse(size);

        let r = normalized_autocorrelation(&frame, &fft, &ifft);
        assert!((r[0] - 1.0).abs() < 1e-9);
        // 200 Hz at 16 kHz: period of 80 samples
        assert!(r[80] > 0.999, "r[80] = {}", r[80]);
    }

    #[test]
    fn test_peak_correlation_interpolates() {
        let correlation = vec![1.0, 0.2, 0.6, 0.9, 0.7, 0.1];
        let peak = peak_correlation(&correlation, 2, 4).unwrap();
        assert!(peak >= 0.9 && peak < 1.0);
        assert!(peak_correlation(&correlation, 4, 4).is_none());
    }
}
