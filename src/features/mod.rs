//! Feature extraction modules
//!
//! This module turns a decoded recording into a fixed-length biomarker vector:
//! - Pitch tracking (McLeod pitch method, voicing decision)
//! - Glottal pulse marking
//! - Perturbation measures (jitter, shimmer)
//! - Harmonics-to-noise ratio
//! - Cepstral peak prominence
//! - Domain validation
//!
//! Everything here is a deterministic function of the signal and the
//! [`AnalysisConfig`]; nothing draws random numbers.

pub mod cepstral;
pub mod hnr;
pub mod perturbation;
pub mod pitch;
pub mod pulses;
pub mod validation;

use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::io::AudioSample;
use crate::preprocessing::normalization::{normalize_peak, peak_db, LoudnessMetadata};
use crate::preprocessing::silence::{detect_and_trim, SilenceDetector};
use serde::{Deserialize, Serialize};
use perturbation::Perturbation;
use validation::DomainWarning;

/// Headroom left below full scale when normalizing before analysis
const NORMALIZATION_HEADROOM_DB: f32 = 1.0;

/// A named acoustic biomarker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Biomarker {
    /// Relative local pitch-period perturbation
    Jitter,
    /// Relative local amplitude perturbation
    Shimmer,
    /// Harmonics-to-noise ratio in dB
    Hnr,
    /// Coefficient of variation of the fundamental frequency
    PitchVariation,
    /// Mean fundamental frequency in Hz
    MeanPitch,
    /// Fraction of analysis frames that are voiced
    VoicedFraction,
    /// Mean cepstral peak prominence in dB
    Cpp,
}

impl Biomarker {
    /// Name used in scaler files and in the response body
    pub fn name(&self) -> &'static str {
        match self {
            Biomarker::Jitter => "jitter",
            Biomarker::Shimmer => "shimmer",
            Biomarker::Hnr => "hnr",
            Biomarker::PitchVariation => "pitchVariation",
            Biomarker::MeanPitch => "meanPitch",
            Biomarker::VoicedFraction => "voicedFraction",
            Biomarker::Cpp => "cpp",
        }
    }

    /// Range of values expected from real voices
    ///
    /// Values outside it are kept and flagged, never clamped.
    pub fn plausible_range(&self) -> (f64, f64) {
        match self {
            Biomarker::Jitter => (0.0, 0.05),
            Biomarker::Shimmer => (0.0, 0.2),
            Biomarker::Hnr => (0.0, 30.0),
            Biomarker::PitchVariation => (0.0, 1.0),
            Biomarker::MeanPitch => (50.0, 500.0),
            Biomarker::VoicedFraction => (0.0, 1.0),
            Biomarker::Cpp => (0.0, 50.0),
        }
    }

    /// Decimal places used when the raw value is surfaced to callers
    pub fn precision(&self) -> u32 {
        match self {
            Biomarker::Hnr | Biomarker::MeanPitch | Biomarker::Cpp => 2,
            _ => 4,
        }
    }
}

const CORE_LAYOUT: [Biomarker; 4] = [
    Biomarker::Jitter,
    Biomarker::Shimmer,
    Biomarker::Hnr,
    Biomarker::PitchVariation,
];

const EXTENDED_LAYOUT: [Biomarker; 7] = [
    Biomarker::Jitter,
    Biomarker::Shimmer,
    Biomarker::Hnr,
    Biomarker::PitchVariation,
    Biomarker::MeanPitch,
    Biomarker::VoicedFraction,
    Biomarker::Cpp,
];

/// Ordering of biomarkers in a feature vector
///
/// The first four positions are the same in every layout, so a scaler and
/// models fitted on the core layout read `jitter`, `shimmer`, `hnr` and
/// `pitchVariation` at indices 0 to 3.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BiomarkerLayout {
    /// jitter, shimmer, hnr, pitchVariation
    #[default]
    Core,
    /// Core followed by meanPitch, voicedFraction, cpp
    Extended,
}

impl BiomarkerLayout {
    /// Biomarkers in vector order
    pub fn biomarkers(&self) -> &'static [Biomarker] {
        match self {
            BiomarkerLayout::Core => &CORE_LAYOUT,
            BiomarkerLayout::Extended => &EXTENDED_LAYOUT,
        }
    }

    /// Vector length
    pub fn len(&self) -> usize {
        self.biomarkers().len()
    }

    /// Always false; every layout has at least the four core biomarkers
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Biomarker names in vector order
    pub fn names(&self) -> Vec<&'static str> {
        self.biomarkers().iter().map(|b| b.name()).collect()
    }

    /// Index of a biomarker, if this layout carries it
    pub fn position(&self, biomarker: Biomarker) -> Option<usize> {
        self.biomarkers().iter().position(|&b| b == biomarker)
    }
}

/// Ordered, fixed-length biomarker values
///
/// Used both for raw measurements and for their scaled counterparts.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    layout: BiomarkerLayout,
    values: Vec<f64>,
}

impl FeatureVector {
    /// Build a vector, checking its length against the layout
    pub fn new(layout: BiomarkerLayout, values: Vec<f64>) -> Result<Self, AnalysisError> {
        if values.len() != layout.len() {
            return Err(AnalysisError::Configuration(format!(
                "{:?} layout expects {} values, got {}",
                layout,
                layout.len(),
                values.len()
            )));
        }
        Ok(Self { layout, values })
    }

    /// Layout of this vector
    pub fn layout(&self) -> BiomarkerLayout {
        self.layout
    }

    /// Values in layout order
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Number of values
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True for a zero-length vector (never produced by a valid layout)
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Value of one biomarker, if the layout carries it
    pub fn get(&self, biomarker: Biomarker) -> Option<f64> {
        self.layout.position(biomarker).map(|i| self.values[i])
    }

    /// `(biomarker, value)` pairs in layout order
    pub fn iter(&self) -> impl Iterator<Item = (Biomarker, f64)> + '_ {
        self.layout
            .biomarkers()
            .iter()
            .copied()
            .zip(self.values.iter().copied())
    }
}

/// Every measurement taken from one recording, before layout selection
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceMeasures {
    /// Local jitter (ratio)
    pub jitter: f64,
    /// Local shimmer (ratio)
    pub shimmer: f64,
    /// Harmonics-to-noise ratio (dB)
    pub hnr: f64,
    /// F0 coefficient of variation
    pub pitch_variation: f64,
    /// Mean F0 of voiced frames (Hz)
    pub mean_pitch_hz: f64,
    /// Voiced frames / analysed frames
    pub voiced_fraction: f64,
    /// Mean cepstral peak prominence (dB); only measured for the extended layout
    pub cpp_db: Option<f64>,
}

/// Result of analysing one recording
#[derive(Debug, Clone)]
pub struct VoiceAnalysis {
    /// Raw biomarker vector in the configured layout
    pub vector: FeatureVector,
    /// All measurements
    pub measures: VoiceMeasures,
    /// Levels before normalization
    pub loudness: LoudnessMetadata,
    /// Jitter and shimmer with their pair counts
    pub perturbation: Perturbation,
    /// Duration analysed after trimming silence, in seconds
    pub analysed_seconds: f32,
    /// Number of voiced frames
    pub voiced_frames: usize,
    /// Number of analysis frames
    pub total_frames: usize,
    /// Number of glottal cycles found
    pub glottal_cycles: usize,
    /// Biomarkers outside their plausible range
    pub warnings: Vec<DomainWarning>,
}

/// Extract the biomarker vector from a recording
///
/// # Errors
///
/// Returns `AnalysisError::FeatureExtraction` if the recording is too short,
/// silent, or lacks enough voiced speech for every biomarker.
pub fn extract_features(
    sample: &AudioSample,
    config: &AnalysisConfig,
) -> Result<FeatureVector, AnalysisError> {
    analyze_voice(sample, config).map(|analysis| analysis.vector)
}

/// Extract biomarkers along with frame statistics and domain flags
///
/// # Algorithm
///
/// 1. Reject recordings shorter than `min_duration_ms` or quieter than
///    `silence_threshold_db`
/// 2. Peak-normalize and trim leading/trailing silence
/// 3. Track pitch; frames with a confident F0 in range are voiced
/// 4. Mark glottal pulses within each voiced run
/// 5. Jitter and shimmer from adjacent cycles, HNR from frame autocorrelation,
///    pitch variation from the F0 track
/// 6. Validate domains (flag, do not clamp)
pub fn analyze_voice(
    sample: &AudioSample,
    config: &AnalysisConfig,
) -> Result<VoiceAnalysis, AnalysisError> {
    config.validate()?;
    let sample_rate = sample.sample_rate();

    log::debug!(
        "Extracting biomarkers: {} samples at {} Hz, layout {:?}",
        sample.len(),
        sample_rate,
        config.layout
    );

    // The pitch range must sit below Nyquist
    if (sample_rate as f32) < 2.0 * config.max_pitch_hz {
        return Err(AnalysisError::FeatureExtraction(format!(
            "Sample rate {} Hz cannot represent pitch up to {:.0} Hz",
            sample_rate, config.max_pitch_hz
        )));
    }

    let min_samples = ((config.min_duration_ms / 1000.0) * sample_rate as f32).ceil() as usize;
    if sample.len() < min_samples.max(config.frame_size(sample_rate)) {
        return Err(AnalysisError::FeatureExtraction(format!(
            "Recording too short: {:.0} ms, need at least {:.0} ms",
            sample.duration_seconds() * 1000.0,
            config.min_duration_ms.max(config.frame_ms)
        )));
    }

    let level_db = peak_db(sample.samples());
    if level_db < config.silence_threshold_db {
        return Err(AnalysisError::FeatureExtraction(format!(
            "Recording is silent (peak {:.1} dBFS)",
            level_db
        )));
    }

    let mut samples = sample.samples().to_vec();
    let loudness = normalize_peak(&mut samples, NORMALIZATION_HEADROOM_DB)?;

    let detector = SilenceDetector {
        threshold_db: config.trim_threshold_db,
        frame_size: config.frame_size(sample_rate),
    };
    let (region, _) = detect_and_trim(&samples, &detector)?;
    if region.len() < min_samples {
        return Err(AnalysisError::FeatureExtraction(format!(
            "Only {:.0} ms of sound after trimming silence",
            region.len() as f32 * 1000.0 / sample_rate as f32
        )));
    }

    let track = pitch::track_pitch(region, sample_rate, config)?;
    let train = pulses::find_pulses(region, &track);
    let perturbation = perturbation::measure_perturbation(&train, sample_rate, config)?;
    let hnr = hnr::harmonics_to_noise(region, &track, config)?;

    let cpp_db = match config.layout {
        BiomarkerLayout::Core => None,
        BiomarkerLayout::Extended => Some(cepstral::mean_cpp(region, &track, config).ok_or_else(
            || AnalysisError::FeatureExtraction("No cepstral peak in voiced frames".to_string()),
        )?),
    };

    let measures = VoiceMeasures {
        jitter: perturbation.jitter,
        shimmer: perturbation.shimmer,
        hnr,
        pitch_variation: track.coefficient_of_variation(),
        mean_pitch_hz: track.mean_frequency(),
        voiced_fraction: track.voiced_fraction(),
        cpp_db,
    };

    let values = config
        .layout
        .biomarkers()
        .iter()
        .map(|biomarker| match biomarker {
            Biomarker::Jitter => measures.jitter,
            Biomarker::Shimmer => measures.shimmer,
            Biomarker::Hnr => measures.hnr,
            Biomarker::PitchVariation => measures.pitch_variation,
            Biomarker::MeanPitch => measures.mean_pitch_hz,
            Biomarker::VoicedFraction => measures.voiced_fraction,
            Biomarker::Cpp => measures.cpp_db.unwrap_or(f64::NAN),
        })
        .collect();
    let vector = FeatureVector::new(config.layout, values)?;

    validation::ensure_finite(&vector)?;
    let warnings = validation::check_domains(&vector);
    for warning in &warnings {
        log::warn!("{}", warning);
    }

    log::debug!(
        "Biomarkers: jitter={:.5}, shimmer={:.5}, hnr={:.2} dB, pitch_variation={:.4} ({} voiced of {} frames, {} cycles)",
        measures.jitter,
        measures.shimmer,
        measures.hnr,
        measures.pitch_variation,
        track.frames.len(),
        track.total_frames,
        train.cycle_count()
    );

    Ok(VoiceAnalysis {
        vector,
        measures,
        loudness,
        perturbation,
        analysed_seconds: region.len() as f32 / sample_rate as f32,
        voiced_frames: track.frames.len(),
        total_frames: track.total_frames,
        glottal_cycles: train.cycle_count(),
        warnings,
    })
}

#[cfg(test)]
pub(crate) mod test_signals {
    //! Synthetic voice-like signals shared by the feature tests

    use std::f32::consts::PI;

    /// Sustained vowel-like tone: fundamental plus two decaying harmonics
    pub fn vowel(freq: f32, sample_rate: u32, duration_ms: u32) -> Vec<f32> {
        let n = (sample_rate as u64 * duration_ms as u64 / 1000) as usize;
        (0..n)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                0.5 * (2.0 * PI * freq * t).sin()
                    + 0.25 * (2.0 * PI * 2.0 * freq * t).sin()
                    + 0.12 * (2.0 * PI * 3.0 * freq * t).sin()
            })
            .collect()
    }

    /// Tone whose period alternates between `freq * (1 + d)` and `freq * (1 - d)`
    /// and whose cycle amplitude alternates between `1 + a` and `1 - a` (scaled)
    pub fn perturbed(freq: f32, sample_rate: u32, duration_ms: u32, d: f32, a: f32) -> Vec<f32> {
        let n = (sample_rate as u64 * duration_ms as u64 / 1000) as usize;
        let mut phase = 0.0f32;
        let mut cycle = 0usize;
        (0..n)
            .map(|_| {
                let sign = if cycle % 2 == 0 { 1.0 } else { -1.0 };
                let f = freq * (1.0 + sign * d);
                let amp = 0.5 * (1.0 + sign * a);
                let value = amp * (2.0 * PI * phase).sin();
                phase += f / sample_rate as f32;
                if phase >= 1.0 {
                    phase -= 1.0;
                    cycle += 1;
                }
                value
            })
            .collect()
    }

    /// Deterministic uniform noise in [-amplitude, amplitude]
    pub fn noise(len: usize, amplitude: f32, seed: u32) -> Vec<f32> {
        let mut state = seed;
        (0..len)
            .map(|_| {
                state = state.wrapping_mul(1103515245).wrapping_add(12345);
                ((state >> 16) as f32 / 32768.0 - 1.0) * amplitude
            })
            .collect()
    }

    /// Element-wise sum
    pub fn mix(a: &[f32], b: &[f32]) -> Vec<f32> {
        a.iter().zip(b).map(|(x, y)| x + y).collect()
    }
}
