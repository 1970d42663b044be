//! Silence detection and trimming utilities

use super::normalization::db_to_amplitude;
use crate::error::AnalysisError;
use crate::io::audio_sample::Frames;

/// Silence detection configuration
#[derive(Debug, Clone)]
pub struct SilenceDetector {
    /// Frame RMS threshold in dBFS
    pub threshold_db: f32,

    /// Frame size for analysis in samples
    pub frame_size: usize,
}

impl SilenceDetector {
    /// True when the frame's RMS is below the threshold
    pub fn is_silent(&self, frame: &[f32]) -> bool {
        frame_rms(frame) < db_to_amplitude(self.threshold_db)
    }
}

/// Root mean square of a frame
pub fn frame_rms(frame: &[f32]) -> f32 {
    if frame.is_empty() {
        return 0.0;
    }
    (frame.iter().map(|&x| x * x).sum::<f32>() / frame.len() as f32).sqrt()
}

/// Detect and trim leading and trailing silence
///
/// Frames are laid end to end (no overlap). The kept region runs from the
/// first non-silent frame to the end of the last non-silent frame; a final
/// partial frame is kept when the last full frame is non-silent. Silence in
/// the middle of the recording is left in place (it is simply unvoiced).
///
/// # Arguments
///
/// * `samples` - Audio samples
/// * `detector` - Silence detection configuration
///
/// # Returns
///
/// The trimmed slice and the `(start, end)` sample range it covers
///
/// # Errors
///
/// Returns `AnalysisError::FeatureExtraction` if every frame is silent.
pub fn detect_and_trim<'a>(
    samples: &'a [f32],
    detector: &SilenceDetector,
) -> Result<(&'a [f32], (usize, usize)), AnalysisError> {
    log::debug!("Detecting silence in {} samples", samples.len());

    let frame_size = detector.frame_size.max(1);
    if samples.len() < frame_size {
        // Too short to frame; judge it as a single block
        if detector.is_silent(samples) {
            return Err(AnalysisError::FeatureExtraction(
                "Audio is entirely silent after trimming".to_string(),
            ));
        }
        return Ok((samples, (0, samples.len())));
    }

    let loud: Vec<usize> = Frames::new(samples, frame_size, frame_size)
        .filter(|(_, frame)| !detector.is_silent(frame))
        .map(|(start, _)| start)
        .collect();

    let (first, last) = match (loud.first(), loud.last()) {
        (Some(&first), Some(&last)) => (first, last),
        _ => {
            return Err(AnalysisError::FeatureExtraction(
                "Audio is entirely silent after trimming".to_string(),
            ))
        }
    };

    let mut end = last + frame_size;
    let tail_start = (samples.len() / frame_size) * frame_size;
    if end == tail_start && !detector.is_silent(&samples[tail_start..]) {
        end = samples.len();
    }

    log::debug!(
        "Trimmed silence: kept samples {}..{} of {}",
        first,
        end,
        samples.len()
    );

    Ok((&samples[first..end], (first, end)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> SilenceDetector {
        SilenceDetector {
            threshold_db: -40.0,
            frame_size: 1024,
        }
    }

    fn tone(len: usize) -> Vec<f32> {
        (0..len).map(|i| 0.5 * (i as f32 * 0.1).sin()).collect()
    }

    #[test]
    fn test_trims_leading_and_trailing_silence() {
        let mut samples = vec![0.0f32; 4096];
        samples.extend(tone(8192));
        samples.extend(vec![0.0f32; 4096]);

        let (trimmed, (start, end)) = detect_and_trim(&samples, &detector()).unwrap();
        assert_eq!(start, 4096);
        assert_eq!(end, 4096 + 8192);
        assert_eq!(trimmed.len(), 8192);
    }

    #[test]
    fn test_all_silent_is_error() {
        let samples = vec![0.0f32; 10000];
        let result = detect_and_trim(&samples, &detector());
        assert!(matches!(result, Err(AnalysisError::FeatureExtraction(_))));
        if let Err(e) = result {
            assert!(e.to_string().contains("silent"));
        }
    }

    #[test]
    fn test_keeps_partial_tail_after_loud_frame() {
        let samples = tone(1024 * 3 + 100);
        let (trimmed, _) = detect_and_trim(&samples, &detector()).unwrap();
        assert_eq!(trimmed.len(), samples.len());
    }

    #[test]
    fn test_short_signal_judged_whole() {
        let samples = tone(300);
        let (trimmed, range) = detect_and_trim(&samples, &detector()).unwrap();
        assert_eq!(trimmed.len(), 300);
        assert_eq!(range, (0, 300));
    }

    #[test]
    fn test_frame_rms() {
        assert_eq!(frame_rms(&[]), 0.0);
        assert!((frame_rms(&[0.5, -0.5, 0.5, -0.5]) - 0.5).abs() < 1e-6);
    }
}
