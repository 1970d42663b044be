//! Fundamental frequency tracking
//!
//! Frames the signal, gates quiet frames, and runs the McLeod pitch method on
//! the rest. A frame counts as voiced when it yields an F0 inside the
//! configured vocal range with at least the configured clarity.
//!
//! # Reference
//!
//! McLeod, P., & Wyvill, G. (2005). A Smarter Way to Find Pitch.
//! *Proceedings of the International Computer Music Conference*.

use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::io::audio_sample::Frames;
use crate::preprocessing::normalization::db_to_amplitude;
use crate::preprocessing::silence::frame_rms;
use pitch_detection::detector::mcleod::McLeodDetector;
use pitch_detection::detector::PitchDetector;

/// Power floor passed to the detector; quiet frames are already gated by RMS
const POWER_THRESHOLD: f32 = 1e-6;

/// One voiced analysis frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PitchFrame {
    /// First sample of the frame
    pub start: usize,
    /// Fundamental frequency in Hz
    pub frequency: f32,
    /// McLeod clarity (0.0-1.0)
    pub clarity: f32,
}

/// Voiced frames of a recording
#[derive(Debug, Clone)]
pub struct PitchTrack {
    /// Voiced frames in time order
    pub frames: Vec<PitchFrame>,
    /// Number of frames analysed (voiced or not)
    pub total_frames: usize,
    /// Frame length in samples
    pub frame_size: usize,
    /// Hop between frames in samples
    pub hop_size: usize,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl PitchTrack {
    /// Fraction of analysed frames that are voiced
    pub fn voiced_fraction(&self) -> f64 {
        if self.total_frames == 0 {
            return 0.0;
        }
        self.frames.len() as f64 / self.total_frames as f64
    }

    /// Mean F0 over voiced frames (Hz)
    pub fn mean_frequency(&self) -> f64 {
        if self.frames.is_empty() {
            return 0.0;
        }
        self.frames.iter().map(|f| f.frequency as f64).sum::<f64>() / self.frames.len() as f64
    }

    /// Standard deviation of F0 divided by its mean
    pub fn coefficient_of_variation(&self) -> f64 {
        let mean = self.mean_frequency();
        if mean <= 0.0 {
            return 0.0;
        }
        let variance = self
            .frames
            .iter()
            .map(|f| (f.frequency as f64 - mean).powi(2))
            .sum::<f64>()
            / self.frames.len() as f64;
        variance.sqrt() / mean
    }

    /// Runs of consecutive voiced frames (no unvoiced frame in between)
    pub fn voiced_runs(&self) -> Vec<&[PitchFrame]> {
        let mut runs = Vec::new();
        let mut run_start = 0;
        for i in 1..=self.frames.len() {
            let broken = i == self.frames.len()
                || self.frames[i].start != self.frames[i - 1].start + self.hop_size;
            if broken {
                runs.push(&self.frames[run_start..i]);
                run_start = i;
            }
        }
        runs
    }
}

/// Track F0 across a (normalized, trimmed) signal
///
/// # Errors
///
/// Returns `AnalysisError::FeatureExtraction` if fewer than
/// `config.min_voiced_frames` frames are voiced.
pub fn track_pitch(
    samples: &[f32],
    sample_rate: u32,
    config: &AnalysisConfig,
) -> Result<PitchTrack, AnalysisError> {
    let frame_size = config.frame_size(sample_rate);
    let hop_size = config.hop_size(sample_rate);
    let gate = db_to_amplitude(config.trim_threshold_db);

    let min_frame = (2.0 * sample_rate as f32 / config.min_pitch_hz) as usize;
    if frame_size < min_frame.max(2) {
        return Err(AnalysisError::FeatureExtraction(format!(
            "Frame of {} samples at {} Hz cannot hold two periods of {:.0} Hz",
            frame_size, sample_rate, config.min_pitch_hz
        )));
    }

    log::debug!(
        "Tracking pitch: {} samples, frame={}, hop={}, range=[{:.0}, {:.0}] Hz",
        samples.len(),
        frame_size,
        hop_size,
        config.min_pitch_hz,
        config.max_pitch_hz
    );

    let mut detector = McLeodDetector::<f32>::new(frame_size, frame_size / 2);
    let mut frames = Vec::new();
    let mut total_frames = 0;

    for (start, frame) in Frames::new(samples, frame_size, hop_size) {
        total_frames += 1;

        if frame_rms(frame) < gate {
            continue;
        }

        let pitch = detector.get_pitch(
            frame,
            sample_rate as usize,
            POWER_THRESHOLD,
            config.clarity_threshold,
        );

        if let Some(pitch) = pitch {
            let in_range =
                pitch.frequency >= config.min_pitch_hz && pitch.frequency <= config.max_pitch_hz;
            if in_range && pitch.clarity >= config.clarity_threshold && pitch.frequency.is_finite() {
                frames.push(PitchFrame {
                    start,
                    frequency: pitch.frequency,
                    clarity: pitch.clarity,
                });
            }
        }
    }

    if frames.len() < config.min_voiced_frames {
        return Err(AnalysisError::FeatureExtraction(format!(
            "No detectable voicing: {} voiced frames of {}, need at least {}",
            frames.len(),
            total_frames,
            config.min_voiced_frames
        )));
    }

    log::debug!("Pitch track: {} voiced of {} frames", frames.len(), total_frames);

    Ok(PitchTrack {
        frames,
        total_frames,
        frame_size,
        hop_size,
        sample_rate,
    })
}
