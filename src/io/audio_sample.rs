//! Decoded mono PCM signal

use crate::error::AnalysisError;

/// Decoded mono signal
///
/// Amplitudes are nominally in [-1.0, 1.0]. One instance belongs to one
/// analysis request and is dropped once features are extracted.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioSample {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl AudioSample {
    /// Wrap decoded samples
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::Decode` if the sample rate is zero.
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Result<Self, AnalysisError> {
        if sample_rate == 0 {
            return Err(AnalysisError::Decode("Invalid sample rate: 0".to_string()));
        }
        Ok(Self {
            samples,
            sample_rate,
        })
    }

    /// Mono samples
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// True when no samples were decoded
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds
    pub fn duration_seconds(&self) -> f32 {
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

/// Iterator over fixed-size analysis frames
///
/// Yields `(start_sample, frame)` for every frame that fits entirely inside
/// the signal.
#[derive(Debug)]
pub struct Frames<'a> {
    data: &'a [f32],
    frame_size: usize,
    hop_size: usize,
    position: usize,
}

impl<'a> Frames<'a> {
    /// Frame `data` with the given frame and hop sizes (both must be non-zero)
    pub fn new(data: &'a [f32], frame_size: usize, hop_size: usize) -> Self {
        Self {
            data,
            frame_size: frame_size.max(1),
            hop_size: hop_size.max(1),
            position: 0,
        }
    }
}

impl<'a> Iterator for Frames<'a> {
    type Item = (usize, &'a [f32]);

    fn next(&mut self) -> Option<Self::Item> {
        if self.position + self.frame_size > self.data.len() {
            return None;
        }
        let start = self.position;
        self.position += self.hop_size;
        Some((start, &self.data[start..start + self.frame_size]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_sample_rate_rejected() {
        assert!(matches!(
            AudioSample::new(vec![0.0; 10], 0),
            Err(AnalysisError::Decode(_))
        ));
    }

    #[test]
    fn test_duration() {
        let sample = AudioSample::new(vec![0.0; 22050], 44100).unwrap();
        assert!((sample.duration_seconds() - 0.5).abs() < 1e-6);
        assert_eq!(sample.len(), 22050);
        assert!(!sample.is_empty());
    }

    #[test]
    fn test_frames_cover_only_complete_windows() {
        let data: Vec<f32> = (0..10).map(|i| i as f32).collect();
        let frames: Vec<(usize, &[f32])> = Frames::new(&data, 4, 3).collect();
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].0, 0);
        assert_eq!(frames[1].1, &[3.0, 4.0, 5.0, 6.0]);
        assert_eq!(frames[2].0, 6);
    }

    #[test]
    fn test_frames_shorter_than_window() {
        let data = vec![0.0f32; 3];
        assert_eq!(Frames::new(&data, 4, 1).count(), 0);
    }
}
