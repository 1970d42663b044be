//! Channel mixing utilities (multi-channel to mono conversion)

use crate::error::AnalysisError;

/// Average interleaved channels down to mono
///
/// # Arguments
///
/// * `interleaved` - Interleaved samples (`L R L R ...` for stereo)
/// * `channels` - Number of channels in the buffer
///
/// # Returns
///
/// One sample per frame, the arithmetic mean of that frame's channels
///
/// # Errors
///
/// Returns `AnalysisError::Decode` if `channels` is zero or the buffer length
/// is not a multiple of the channel count.
pub fn downmix(interleaved: &[f32], channels: usize) -> Result<Vec<f32>, AnalysisError> {
    if channels == 0 {
        return Err(AnalysisError::Decode("Audio declares zero channels".to_string()));
    }
    if channels == 1 {
        return Ok(interleaved.to_vec());
    }
    if interleaved.len() % channels != 0 {
        return Err(AnalysisError::Decode(format!(
            "Interleaved buffer of {} samples is not a multiple of {} channels",
            interleaved.len(),
            channels
        )));
    }

    let scale = 1.0 / channels as f32;
    Ok(interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() * scale)
        .collect())
}
