//! Cycle-to-cycle perturbation (jitter and shimmer)
//!
//! # Algorithm
//!
//! Local jitter is the mean absolute difference between consecutive periods
//! divided by the mean period; local shimmer is the same ratio over
//! consecutive peak amplitudes. Only consecutive cycles of one voiced run are
//! compared, and a pair is skipped when either period falls outside the
//! configured pitch range or when the two values differ by more than the
//! configured factor (a missed or doubled pulse, not a perturbation).

use super::pulses::PulseTrain;
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;

/// Jitter and shimmer of one recording
#[derive(Debug, Clone, PartialEq)]
pub struct Perturbation {
    /// Local jitter (ratio, 0.01 = 1%)
    pub jitter: f64,
    /// Local shimmer (ratio)
    pub shimmer: f64,
    /// Number of period pairs used for jitter
    pub period_pairs: usize,
    /// Number of amplitude pairs used for shimmer
    pub amplitude_pairs: usize,
    /// Mean period in seconds
    pub mean_period_s: f64,
}

/// Running sums for a local perturbation ratio
#[derive(Default)]
struct Accumulator {
    abs_diff: f64,
    value_sum: f64,
    values: usize,
    pairs: usize,
}

impl Accumulator {
    fn push_pair(&mut self, a: f64, b: f64) {
        self.abs_diff += (a - b).abs();
        self.value_sum += a + b;
        self.values += 2;
        self.pairs += 1;
    }

    fn mean(&self) -> f64 {
        self.value_sum / self.values as f64
    }

    fn ratio(&self) -> Option<f64> {
        if self.pairs == 0 {
            return None;
        }
        let mean = self.mean();
        if mean <= 0.0 {
            return None;
        }
        Some((self.abs_diff / self.pairs as f64) / mean)
    }
}

fn within_factor(a: f64, b: f64, factor: f64) -> bool {
    a > 0.0 && b > 0.0 && a.max(b) / a.min(b) <= factor
}

/// Measure local jitter and shimmer from marked pulses
///
/// # Errors
///
/// Returns `AnalysisError::FeatureExtraction` if no run yields a usable pair
/// of consecutive cycles.
pub fn measure_perturbation(
    train: &PulseTrain,
    sample_rate: u32,
    config: &AnalysisConfig,
) -> Result<Perturbation, AnalysisError> {
    let min_period = 1.0 / config.max_pitch_hz as f64;
    let max_period = 1.0 / config.min_pitch_hz as f64;
    let period_factor = config.max_period_factor as f64;
    let amplitude_factor = config.max_amplitude_factor as f64;
    let in_range = |p: f64| p >= min_period && p <= max_period;

    let mut periods = Accumulator::default();
    let mut amplitudes = Accumulator::default();

    for (run_periods, run_amplitudes) in train
        .periods(sample_rate)
        .iter()
        .zip(train.amplitudes().iter())
    {
        for pair in run_periods.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if in_range(a) && in_range(b) && within_factor(a, b, period_factor) {
                periods.push_pair(a, b);
            }
        }

        // Amplitude i pairs with i + 1; both must border an in-range period
        for (i, pair) in run_amplitudes.windows(2).enumerate() {
            let (a, b) = (pair[0], pair[1]);
            if in_range(run_periods[i]) && within_factor(a, b, amplitude_factor) {
                amplitudes.push_pair(a, b);
            }
        }
    }

    let jitter = periods.ratio();
    let shimmer = amplitudes.ratio();
    let (jitter, shimmer) = match (jitter, shimmer) {
        (Some(j), Some(s)) => (j, s),
        _ => {
            return Err(AnalysisError::FeatureExtraction(format!(
                "Cannot measure perturbation: fewer than two consecutive glottal cycles ({} cycles marked)",
                train.cycle_count()
            )))
        }
    };

    log::debug!(
        "Perturbation: jitter={:.5} over {} pairs, shimmer={:.5} over {} pairs",
        jitter,
        periods.pairs,
        shimmer,
        amplitudes.pairs
    );

    Ok(Perturbation {
        jitter,
        shimmer,
        period_pairs: periods.pairs,
        amplitude_pairs: amplitudes.pairs,
        mean_period_s: periods.mean(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::pulses::Pulse;

    fn train_from(periods: &[f64], amplitudes: &[f64], sample_rate: f64) -> PulseTrain {
        let mut position = 100.0;
        let mut run = vec![Pulse {
            position,
            amplitude: amplitudes[0],
        }];
        for (period, &amplitude) in periods.iter().zip(&amplitudes[1..]) {
            position += period * sample_rate;
            run.push(Pulse { position, amplitude });
        }
        PulseTrain { runs: vec![run] }
    }

    #[test]
    fn test_constant_cycles_have_zero_perturbation() {
        let train = train_from(&[0.005; 20], &[0.8; 21], 16000.0);
        let p = measure_perturbation(&train, 16000, &AnalysisConfig::default()).unwrap();
        assert!(p.jitter.abs() < 1e-9);
        assert!(p.shimmer.abs() < 1e-9);
        assert_eq!(p.period_pairs, 19);
        assert!((p.mean_period_s - 0.005).abs() < 1e-9);
    }

    #[test]
    fn test_alternating_cycles() {
        let periods: Vec<f64> = (0..20).map(|i| if i % 2 == 0 { 0.0055 } else { 0.0045 }).collect();
        let amplitudes: Vec<f64> = (0..21).map(|i| if i % 2 == 0 { 0.6 } else { 0.4 }).collect();
        let train = train_from(&periods, &amplitudes, 16000.0);

        let p = measure_perturbation(&train, 16000, &AnalysisConfig::default()).unwrap();
        // |0.0055 - 0.0045| / 0.005
        assert!((p.jitter - 0.2).abs() < 1e-6, "jitter {}", p.jitter);
        // |0.6 - 0.4| / 0.5
        assert!((p.shimmer - 0.4).abs() < 1e-6, "shimmer {}", p.shimmer);
    }

    #[test]
    fn test_outlier_pairs_skipped() {
        // One doubled period (missed pulse) in an otherwise steady run
        let mut periods = vec![0.005; 10];
        periods[5] = 0.010;
        let train = train_from(&periods, &[0.5; 11], 16000.0);

        let p = measure_perturbation(&train, 16000, &AnalysisConfig::default()).unwrap();
        assert_eq!(p.period_pairs, 7);
        assert!(p.jitter.abs() < 1e-9);
    }

    #[test]
    fn test_runs_are_not_bridged() {
        let a = train_from(&[0.005; 3], &[0.5; 4], 16000.0);
        let mut b = train_from(&[0.004; 3], &[0.5; 4], 16000.0);
        for pulse in &mut b.runs[0] {
            pulse.position += 10000.0;
        }
        let train = PulseTrain {
            runs: vec![a.runs[0].clone(), b.runs[0].clone()],
        };

        let p = measure_perturbation(&train, 16000, &AnalysisConfig::default()).unwrap();
        assert_eq!(p.period_pairs, 4);
        assert!(p.jitter.abs() < 1e-9);
    }

    #[test]
    fn test_single_cycle_is_error() {
        let train = train_from(&[0.005], &[0.5, 0.5], 16000.0);
        assert!(matches!(
            measure_perturbation(&train, 16000, &AnalysisConfig::default()),
            Err(AnalysisError::FeatureExtraction(_))
        ));
    }
}
