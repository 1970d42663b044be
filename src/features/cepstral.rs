//! Cepstral peak prominence (CPP)
//!
//! A periodic voice produces a regularly spaced harmonic comb in the log
//! spectrum, which the real cepstrum turns into a single peak at the pitch
//! period. Breathy or irregular voices flatten that peak.
//!
//! # Algorithm
//!
//! Per voiced frame:
//! 1. Apply a Hann window and zero-pad to a power of two
//! 2. FFT, natural-log magnitude, inverse FFT (real cepstrum)
//! 3. Find the largest |c(q)| for quefrencies between the shortest and
//!    longest allowed pitch periods
//! 4. CPP = 20·log10(peak / mean |c(q)| over the same range)
//!
//! The recording's CPP is the mean over frames.

use super::pitch::PitchTrack;
use crate::config::AnalysisConfig;
use rustfft::num_complex::Complex;
use rustfft::FftPlanner;
use std::f64::consts::PI;

/// Floor added to magnitudes before the logarithm
const LOG_FLOOR: f64 = 1e-10;

/// Mean cepstral peak prominence (dB) over voiced frames
///
/// Returns `None` when no frame yields a finite value.
pub fn mean_cpp(samples: &[f32], track: &PitchTrack, config: &AnalysisConfig) -> Option<f64> {
    let frame_size = track.frame_size;
    let n = frame_size.next_power_of_two();
    let sample_rate = track.sample_rate as f64;
    let min_q = (sample_rate / config.max_pitch_hz as f64).floor() as usize;
    let max_q = ((sample_rate / config.min_pitch_hz as f64).ceil() as usize).min(n / 2);
    if min_q < 1 || min_q >= max_q {
        return None;
    }

    let mut planner = FftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(n);
    let ifft = planner.plan_fft_inverse(n);

    let window: Vec<f64> = (0..frame_size)
        .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f64 / frame_size as f64).cos())
        .collect();

    let mut total = 0.0;
    let mut counted = 0usize;

    for frame in &track.frames {
        let end = frame.start + frame_size;
        if end > samples.len() {
            continue;
        }

        let mut spectrum: Vec<Complex<f64>> = samples[frame.start..end]
            .iter()
            .zip(&window)
            .map(|(&s, &w)| Complex::new(s as f64 * w, 0.0))
            .collect();
        spectrum.resize(n, Complex::new(0.0, 0.0));
        fft.process(&mut spectrum);

        let mut cepstrum: Vec<Complex<f64>> = spectrum
            .iter()
            .map(|c| Complex::new((c.norm() + LOG_FLOOR).ln(), 0.0))
            .collect();
        ifft.process(&mut cepstrum);

        let range = &cepstrum[min_q..max_q];
        let peak = range.iter().map(|c| c.re.abs()).fold(0.0f64, f64::max);
        let mean = range.iter().map(|c| c.re.abs()).sum::<f64>() / range.len() as f64;
        if mean <= LOG_FLOOR {
            continue;
        }

        let cpp = 20.0 * (peak / mean).log10();
        if cpp.is_finite() {
            total += cpp;
            counted += 1;
        }
    }

    if counted == 0 {
        return None;
    }
    let cpp = total / counted as f64;
    log::debug!("CPP: {:.2} dB over {} frames", cpp, counted);
    Some(cpp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::pitch::track_pitch;
    use crate::features::test_signals::*;

    /// Glottal-like source: every harmonic below 4 kHz at 1/k amplitude
    fn harmonic_rich(freq: f32, sample_rate: u32, duration_ms: u32) -> Vec<f32> {
        let n = (sample_rate as u64 * duration_ms as u64 / 1000) as usize;
        let harmonics = (4000.0 / freq) as usize;
        (0..n)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                (1..=harmonics)
                    .map(|k| {
                        0.3 / k as f32 * (2.0 * std::f32::consts::PI * k as f32 * freq * t).sin()
                    })
                    .sum::<f32>()
            })
            .collect()
    }

    fn cpp_of(samples: &[f32]) -> Option<f64> {
        let config = AnalysisConfig::default();
        let track = track_pitch(samples, 16000, &config).ok()?;
        mean_cpp(samples, &track, &config)
    }

    #[test]
    fn test_harmonic_tone_has_prominent_peak() {
        let cpp = cpp_of(&harmonic_rich(150.0, 16000, 600)).unwrap();
        assert!(cpp > 5.0, "cpp {}", cpp);
    }

    #[test]
    fn test_noise_flattens_cepstrum() {
        let tone = harmonic_rich(150.0, 16000, 600);
        let clean = cpp_of(&tone).unwrap();
        let noisy = cpp_of(&mix(&tone, &noise(tone.len(), 0.2, 11))).unwrap();
        assert!(clean > noisy, "clean {} noisy {}", clean, noisy);
    }

    #[test]
    fn test_empty_track_gives_none() {
        let track = PitchTrack {
            frames: Vec::new(),
            total_frames: 10,
            frame_size: 640,
            hop_size: 160,
            sample_rate: 16000,
        };
        assert!(mean_cpp(&[0.0; 4000], &track, &AnalysisConfig::default()).is_none());
    }
}
