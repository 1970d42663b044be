//! Glottal pulse marking
//!
//! Locates one waveform peak per glottal cycle inside each voiced run. The
//! first pulse is the strongest excursion in the run's first period; every
//! following pulse is the strongest excursion of the same polarity between
//! 0.8 and 1.2 local periods after the previous one. Peak positions and
//! heights are refined with parabolic interpolation, giving sub-sample
//! period estimates.

use super::pitch::{PitchFrame, PitchTrack};

/// Search window around the expected next pulse, as a fraction of the period
const SEARCH_LOW: f64 = 0.8;
const SEARCH_HIGH: f64 = 1.2;

/// One marked glottal pulse
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pulse {
    /// Interpolated peak position in samples
    pub position: f64,
    /// Interpolated peak height (always positive)
    pub amplitude: f64,
}

/// Pulses grouped by voiced run
///
/// Periods are only formed between pulses of the same run; a pause never
/// contributes a "period".
#[derive(Debug, Clone, Default)]
pub struct PulseTrain {
    /// Pulses of each voiced run, in time order
    pub runs: Vec<Vec<Pulse>>,
}

impl PulseTrain {
    /// Periods in seconds between successive pulses, per run
    pub fn periods(&self, sample_rate: u32) -> Vec<Vec<f64>> {
        self.runs
            .iter()
            .map(|run| {
                run.windows(2)
                    .map(|w| (w[1].position - w[0].position) / sample_rate as f64)
                    .collect()
            })
            .collect()
    }

    /// Peak amplitudes, per run
    pub fn amplitudes(&self) -> Vec<Vec<f64>> {
        self.runs
            .iter()
            .map(|run| run.iter().map(|p| p.amplitude).collect())
            .collect()
    }

    /// Number of complete cycles (pulse-to-pulse intervals)
    pub fn cycle_count(&self) -> usize {
        self.runs.iter().map(|run| run.len().saturating_sub(1)).sum()
    }
}

/// Mark glottal pulses in every voiced run of a pitch track
pub fn find_pulses(samples: &[f32], track: &PitchTrack) -> PulseTrain {
    let runs: Vec<Vec<Pulse>> = track
        .voiced_runs()
        .into_iter()
        .map(|run| pulses_in_run(samples, track, run))
        .filter(|pulses| pulses.len() >= 2)
        .collect();

    let train = PulseTrain { runs };
    log::debug!(
        "Marked {} glottal cycles in {} voiced run(s)",
        train.cycle_count(),
        train.runs.len()
    );
    train
}

fn pulses_in_run(samples: &[f32], track: &PitchTrack, run: &[PitchFrame]) -> Vec<Pulse> {
    let (first, last) = match (run.first(), run.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return Vec::new(),
    };
    let run_start = first.start;
    let run_end = (last.start + track.frame_size).min(samples.len());
    let sample_rate = track.sample_rate as f64;

    // Local period at a sample position, from the frame covering it
    let period_at = |position: usize| -> f64 {
        let offset = position.saturating_sub(run_start) / track.hop_size;
        let frame = &run[offset.min(run.len() - 1)];
        sample_rate / frame.frequency as f64
    };

    let first_period = period_at(run_start).ceil() as usize;
    let first_end = (run_start + first_period).min(run_end);
    if first_end <= run_start + 1 {
        return Vec::new();
    }

    let (first_index, first_value) = match samples[run_start..first_end]
        .iter()
        .enumerate()
        .max_by(|a, b| a.1.abs().total_cmp(&b.1.abs()))
    {
        Some((i, &v)) => (run_start + i, v),
        None => return Vec::new(),
    };
    if first_value == 0.0 {
        return Vec::new();
    }
    let polarity = first_value.signum();

    let mut pulses = vec![refine_peak(samples, first_index, polarity)];
    let mut last_index = first_index;

    loop {
        let period = period_at(last_index);
        let low = last_index + (period * SEARCH_LOW).floor() as usize;
        let high = last_index + (period * SEARCH_HIGH).ceil() as usize;
        if high >= run_end || low >= high {
            break;
        }

        let (index, value) = match samples[low..=high]
            .iter()
            .enumerate()
            .map(|(i, &v)| (low + i, v * polarity))
            .max_by(|a, b| a.1.total_cmp(&b.1))
        {
            Some(best) => best,
            None => break,
        };
        if value <= 0.0 {
            break;
        }

        pulses.push(refine_peak(samples, index, polarity));
        last_index = index;
    }

    pulses
}

/// Parabolic interpolation of the peak at `index`
fn refine_peak(samples: &[f32], index: usize, polarity: f32) -> Pulse {
    let y1 = (samples[index] * polarity) as f64;
    if index == 0 || index + 1 >= samples.len() {
        return Pulse {
            position: index as f64,
            amplitude: y1,
        };
    }

    let y0 = (samples[index - 1] * polarity) as f64;
    let y2 = (samples[index + 1] * polarity) as f64;
    let denom = y0 - 2.0 * y1 + y2;
    if denom.abs() < 1e-12 {
        return Pulse {
            position: index as f64,
            amplitude: y1,
        };
    }

    let offset = (0.5 * (y0 - y2) / denom).clamp(-0.5, 0.5);
    Pulse {
        position: index as f64 + offset,
        amplitude: y1 - 0.25 * (y0 - y2) * offset,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;
    use crate::features::pitch::track_pitch;
    use crate::features::test_signals::*;

    #[test]
    fn test_integer_period_pulses() {
        // 200 Hz at 16 kHz: exactly 80 samples per cycle
        let samples = vowel(200.0, 16000, 500);
        let track = track_pitch(&samples, 16000, &AnalysisConfig::default()).unwrap();
        let train = find_pulses(&samples, &track);

        assert_eq!(train.runs.len(), 1);
        for period in &train.periods(16000)[0] {
            assert!((period - 0.005).abs() < 1e-5, "period {}", period);
        }
        assert!(train.cycle_count() > 80);
    }

    #[test]
    fn test_amplitudes_follow_signal() {
        let samples = perturbed(150.0, 16000, 600, 0.0, 0.2);
        let track = track_pitch(&samples, 16000, &AnalysisConfig::default()).unwrap();
        let train = find_pulses(&samples, &track);

        let amplitudes = &train.amplitudes()[0];
        let max = amplitudes.iter().cloned().fold(0.0, f64::max);
        let min = amplitudes.iter().cloned().fold(f64::INFINITY, f64::min);
        assert!((max - 0.6).abs() < 0.01, "max {}", max);
        assert!((min - 0.4).abs() < 0.01, "min {}", min);
    }

    #[test]
    fn test_refine_peak_symmetric() {
        let samples = [0.5, 1.0, 0.5];
        let pulse = refine_peak(&samples, 1, 1.0);
        assert!((pulse.position - 1.0).abs() < 1e-9);
        assert!((pulse.amplitude - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_refine_peak_skewed() {
        // Samples of -(x - 1.25)^2 + 1 at x = 0, 1, 2
        let f = |x: f64| 1.0 - (x - 1.25) * (x - 1.25);
        let samples = [f(0.0) as f32, f(1.0) as f32, f(2.0) as f32];
        let pulse = refine_peak(&samples, 1, 1.0);
        assert!((pulse.position - 1.25).abs() < 1e-6);
        assert!((pulse.amplitude - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_negative_polarity() {
        let samples = [-0.5f32, -1.0, -0.5];
        let pulse = refine_peak(&samples, 1, -1.0);
        assert!((pulse.amplitude - 1.0).abs() < 1e-9);
    }
}
