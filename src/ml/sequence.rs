//! Densely connected 1-D convolutional network (model B)
//!
//! The scaled feature vector is read as a sequence of length N with a single
//! channel. Every block applies a same-padded convolution followed by ReLU
//! and concatenates its output channels onto its input, so block `b` sees the
//! original sequence plus every earlier block's output. Global average
//! pooling reduces each channel to one value, and a linear unit with a
//! logistic produces the probability.
//!
//! ```json
//! {
//!   "input_len": 4,
//!   "blocks": [
//!     { "weights": [[[0.2, 0.5, 0.2]], [[-0.3, 0.1, 0.4]]], "bias": [0.0, 0.1] }
//!   ],
//!   "output": { "weights": [0.3, 0.8, -0.6], "bias": -0.1 }
//! }
//! ```
//!
//! Block weights are indexed `[out_channel][in_channel][tap]`; kernels have an
//! odd number of taps.

use super::{sigmoid, Scorer};
use crate::error::AnalysisError;
use serde::Deserialize;
use std::path::Path;

/// One dense block: convolution + ReLU, output concatenated to input
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ConvBlock {
    /// Kernels, `[out_channel][in_channel][tap]`
    pub weights: Vec<Vec<Vec<f64>>>,
    /// One bias per output channel
    pub bias: Vec<f64>,
}

impl ConvBlock {
    fn out_channels(&self) -> usize {
        self.weights.len()
    }

    fn kernel_size(&self) -> usize {
        self.weights
            .first()
            .and_then(|w| w.first())
            .map(|k| k.len())
            .unwrap_or(0)
    }

    /// Convolve `input` (channels x length) into new channels
    fn forward(&self, input: &[Vec<f64>]) -> Vec<Vec<f64>> {
        let len = input.first().map(|c| c.len()).unwrap_or(0);
        let pad = self.kernel_size() / 2;

        self.weights
            .iter()
            .zip(&self.bias)
            .map(|(kernels, &bias)| {
                (0..len)
                    .map(|t| {
                        let mut acc = bias;
                        for (channel, kernel) in input.iter().zip(kernels) {
                            for (j, &w) in kernel.iter().enumerate() {
                                // Zero padding outside the sequence
                                if let Some(pos) = (t + j).checked_sub(pad) {
                                    if pos < len {
                                        acc += w * channel[pos];
                                    }
                                }
                            }
                        }
                        acc.max(0.0)
                    })
                    .collect()
            })
            .collect()
    }
}

/// Final linear unit over pooled channels
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct OutputLayer {
    /// One weight per pooled channel
    pub weights: Vec<f64>,
    /// Bias
    pub bias: f64,
}

/// DenseNet-style 1-D CNN over the feature sequence
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct DenseConvNet {
    input_len: usize,
    blocks: Vec<ConvBlock>,
    output: OutputLayer,
}

impl DenseConvNet {
    /// Build and validate a network
    pub fn new(
        input_len: usize,
        blocks: Vec<ConvBlock>,
        output: OutputLayer,
    ) -> Result<Self, AnalysisError> {
        let net = Self {
            input_len,
            blocks,
            output,
        };
        net.validate()?;
        Ok(net)
    }

    /// Load from a JSON artifact
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, AnalysisError> {
        let net: Self = super::read_artifact(path.as_ref(), "dense conv net")?;
        net.validate()?;
        log::info!(
            "Dense conv net: {} blocks, {} pooled channels, input length {}",
            net.blocks.len(),
            net.output.weights.len(),
            net.input_len
        );
        Ok(net)
    }

    /// Parse from JSON text
    pub fn from_json(text: &str) -> Result<Self, AnalysisError> {
        let net: Self = serde_json::from_str(text)
            .map_err(|e| AnalysisError::Configuration(format!("invalid dense conv net: {}", e)))?;
        net.validate()?;
        Ok(net)
    }

    fn validate(&self) -> Result<(), AnalysisError> {
        let invalid = |msg: String| Err(AnalysisError::Configuration(msg));

        if self.input_len == 0 {
            return invalid("dense conv net declares zero input length".to_string());
        }

        let mut channels = 1;
        for (b, block) in self.blocks.iter().enumerate() {
            let k = block.kernel_size();
            if block.out_channels() == 0 || k % 2 == 0 {
                return invalid(format!(
                    "block {}: needs at least one output channel and an odd kernel, got {} channels of size {}",
                    b,
                    block.out_channels(),
                    k
                ));
            }
            if block.bias.len() != block.out_channels() {
                return invalid(format!(
                    "block {}: {} biases for {} output channels",
                    b,
                    block.bias.len(),
                    block.out_channels()
                ));
            }
            for (o, kernels) in block.weights.iter().enumerate() {
                if kernels.len() != channels {
                    return invalid(format!(
                        "block {} channel {}: expects {} input channels, has {}",
                        b,
                        o,
                        channels,
                        kernels.len()
                    ));
                }
                if kernels.iter().any(|kernel| kernel.len() != k) {
                    return invalid(format!("block {} channel {}: ragged kernel", b, o));
                }
                if kernels.iter().flatten().any(|w| !w.is_finite()) {
                    return invalid(format!("block {} channel {}: non-finite weight", b, o));
                }
            }
            if block.bias.iter().any(|w| !w.is_finite()) {
                return invalid(format!("block {}: non-finite bias", b));
            }
            channels += block.out_channels();
        }

        if self.output.weights.len() != channels {
            return invalid(format!(
                "output layer has {} weights for {} pooled channels",
                self.output.weights.len(),
                channels
            ));
        }
        if self.output.weights.iter().any(|w| !w.is_finite()) || !self.output.bias.is_finite() {
            return invalid("output layer has non-finite parameters".to_string());
        }
        Ok(())
    }

    /// Pre-sigmoid output
    pub fn logit(&self, features: &[f64]) -> f64 {
        let mut channels = vec![features.to_vec()];
        for block in &self.blocks {
            let produced = block.forward(&channels);
            channels.extend(produced);
        }

        let len = features.len().max(1) as f64;
        channels
            .iter()
            .zip(&self.output.weights)
            .map(|(channel, w)| w * channel.iter().sum::<f64>() / len)
            .sum::<f64>()
            + self.output.bias
    }
}

impl Scorer for DenseConvNet {
    fn name(&self) -> &str {
        "dense conv net"
    }

    fn input_len(&self) -> Option<usize> {
        Some(self.input_len)
    }

    fn score(&self, features: &[f64]) -> Result<f64, AnalysisError> {
        if features.len() != self.input_len {
            return Err(AnalysisError::ModelInference(format!(
                "dense conv net expects a sequence of {}, got {}",
                self.input_len,
                features.len()
            )));
        }
        Ok(sigmoid(self.logit(features)))
    }
}
