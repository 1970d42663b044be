//! Audio preprocessing modules
//!
//! This module contains utilities for preparing a recording for analysis:
//! - Channel mixing (multi-channel to mono)
//! - Peak normalization
//! - Silence detection and trimming

pub mod channel_mixer;
pub mod normalization;
pub mod silence;
