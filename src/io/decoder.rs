//! Audio decoding using Symphonia
//!
//! Decodes a complete in-memory audio file into a mono [`AudioSample`]. The
//! container and codec are detected by probing the bytes; no file name hint is
//! needed. Multi-channel audio is averaged down to mono packet by packet.

use super::AudioSample;
use crate::error::AnalysisError;
use crate::preprocessing::channel_mixer::downmix;
use std::io::Cursor;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Decode an audio file held in memory
///
/// # Arguments
///
/// * `bytes` - Complete audio file (WAV, FLAC, MP3, OGG, AAC/MP4, ...)
///
/// # Returns
///
/// Mono samples and the container's sample rate
///
/// # Errors
///
/// Returns `AnalysisError::Decode` if:
/// - The buffer is empty
/// - The format is not recognized or has no audio track
/// - The stream is truncated (fewer frames than the container declares)
/// - No samples could be decoded
///
/// Individual corrupt packets are skipped with a warning.
pub fn decode_audio(bytes: &[u8]) -> Result<AudioSample, AnalysisError> {
    log::debug!("Decoding {} bytes of audio", bytes.len());

    if bytes.is_empty() {
        return Err(AnalysisError::Decode("Empty audio buffer".to_string()));
    }

    let source = Cursor::new(bytes.to_vec());
    let mss = MediaSourceStream::new(Box::new(source), Default::default());

    let probed = symphonia::default::get_probe()
        .format(
            &Hint::new(),
            mss,
            &FormatOptions::default(),
            &MetadataOptions::default(),
        )
        .map_err(|e| AnalysisError::Decode(format!("Unrecognized audio encoding: {}", e)))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| AnalysisError::Decode("No supported audio track found".to_string()))?;

    let track_id = track.id;
    let codec_params = track.codec_params.clone();
    let sample_rate = codec_params
        .sample_rate
        .ok_or_else(|| AnalysisError::Decode("Container does not declare a sample rate".to_string()))?;
    let declared_frames = codec_params.n_frames;

    let mut decoder = symphonia::default::get_codecs()
        .make(&codec_params, &DecoderOptions::default())
        .map_err(|e| AnalysisError::Decode(format!("Unsupported codec: {}", e)))?;

    let mut mono: Vec<f32> = Vec::new();
    let mut channels = 0usize;
    let mut skipped_packets = 0usize;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(ref e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(e) => {
                return Err(AnalysisError::Decode(format!("Failed to read packet: {}", e)));
            }
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                if decoded.frames() == 0 {
                    continue;
                }
                let spec = *decoded.spec();
                channels = spec.channels.count();

                let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                buffer.copy_interleaved_ref(decoded);
                mono.extend(downmix(buffer.samples(), channels)?);
            }
            Err(SymphoniaError::DecodeError(msg)) => {
                log::warn!("Skipping corrupt audio packet: {}", msg);
                skipped_packets += 1;
            }
            Err(e) => {
                return Err(AnalysisError::Decode(format!("Failed to decode packet: {}", e)));
            }
        }
    }

    if mono.is_empty() {
        return Err(AnalysisError::Decode("No audio samples decoded".to_string()));
    }

    if let Some(expected) = declared_frames {
        if (mono.len() as u64) < expected && skipped_packets == 0 {
            return Err(AnalysisError::Decode(format!(
                "Truncated audio stream: decoded {} of {} frames",
                mono.len(),
                expected
            )));
        }
    }

    log::debug!(
        "Decoded {} frames at {} Hz from {} channel(s), {} packet(s) skipped",
        mono.len(),
        sample_rate,
        channels,
        skipped_packets
    );

    AudioSample::new(mono, sample_rate)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wav_bytes(channels: u16, sample_rate: u32, frames: &[Vec<f32>]) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut bytes = Vec::new();
        {
            let mut writer = hound::WavWriter::new(Cursor::new(&mut bytes), spec).unwrap();
            for frame in frames {
                for &s in frame {
                    writer.write_sample((s * i16::MAX as f32) as i16).unwrap();
                }
            }
            writer.finalize().unwrap();
        }
        bytes
    }

    #[test]
    fn test_empty_buffer() {
        assert!(matches!(decode_audio(&[]), Err(AnalysisError::Decode(_))));
    }

    #[test]
    fn test_garbage_bytes() {
        let garbage: Vec<u8> = (0..4096u32).map(|i| (i * 31 % 251) as u8).collect();
        assert!(matches!(decode_audio(&garbage), Err(AnalysisError::Decode(_))));
    }

    #[test]
    fn test_truncated_header() {
        let bytes = wav_bytes(1, 16000, &vec![vec![0.25]; 1600]);
        assert!(matches!(decode_audio(&bytes[..20]), Err(AnalysisError::Decode(_))));
    }

    #[test]
    fn test_truncated_data_chunk() {
        let frames: Vec<Vec<f32>> = (0..16000).map(|i| vec![(i as f32 * 0.05).sin() * 0.5]).collect();
        let bytes = wav_bytes(1, 16000, &frames);
        let cut = &bytes[..bytes.len() / 2];

        match decode_audio(cut) {
            Err(AnalysisError::Decode(msg)) => assert!(msg.contains("Truncated"), "{}", msg),
            other => panic!("expected truncation error, got {:?}", other),
        }
    }

    #[test]
    fn test_mono_wav_rate_and_length() {
        let frames: Vec<Vec<f32>> = (0..8000).map(|i| vec![((i % 100) as f32 / 100.0) - 0.5]).collect();
        let bytes = wav_bytes(1, 8000, &frames);

        let sample = decode_audio(&bytes).unwrap();
        assert_eq!(sample.sample_rate(), 8000);
        assert_eq!(sample.len(), 8000);
        assert!((sample.samples()[10] - frames[10][0]).abs() < 1e-3);
    }

    #[test]
    fn test_stereo_wav_downmixed_by_average() {
        let frames = vec![vec![0.5, 0.25]; 4410];
        let bytes = wav_bytes(2, 44100, &frames);

        let sample = decode_audio(&bytes).unwrap();
        assert_eq!(sample.sample_rate(), 44100);
        assert_eq!(sample.len(), 4410);
        for &s in sample.samples() {
            assert!((s - 0.375).abs() < 1e-3, "expected channel average 0.375, got {}", s);
        }
    }

    #[test]
    fn test_decoding_is_deterministic() {
        let frames: Vec<Vec<f32>> = (0..1000).map(|i| vec![(i as f32 * 0.07).sin() * 0.8]).collect();
        let bytes = wav_bytes(1, 16000, &frames);
        assert_eq!(decode_audio(&bytes).unwrap(), decode_audio(&bytes).unwrap());
    }
}
