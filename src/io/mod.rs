//! Audio I/O modules
//!
//! In-memory audio decoding using Symphonia and the decoded sample type.

pub mod audio_sample;
pub mod decoder;

pub use audio_sample::AudioSample;
pub use decoder::decode_audio;
