//! ONNX-backed scorer
//!
//! Serves either ensemble role from an exported graph. The scaled vector is
//! fed as a `[1, N]` tensor, or `[1, N, 1]` for sequence models exported with
//! a channel axis. The last value of the first output is the probability of
//! the positive class.

use super::Scorer;
use crate::error::AnalysisError;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Value;
use std::path::Path;
use std::sync::Mutex;

/// ONNX model wrapped as a [`Scorer`]
pub struct OnnxModel {
    name: String,
    session: Mutex<Session>,
    sequence_input: bool,
}

impl std::fmt::Debug for OnnxModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxModel")
            .field("name", &self.name)
            .field("sequence_input", &self.sequence_input)
            .finish()
    }
}

impl OnnxModel {
    /// Load a model from file
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::Configuration` if the runtime cannot load the graph.
    pub fn load(path: impl AsRef<Path>, sequence_input: bool) -> Result<Self, AnalysisError> {
        let path = path.as_ref();
        log::info!("Loading ONNX model from {}", path.display());

        let config_err =
            |e: ort::Error| AnalysisError::Configuration(format!("ONNX {}: {}", path.display(), e));
        let session = Session::builder()
            .map_err(config_err)?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(config_err)?
            .with_intra_threads(1)
            .map_err(config_err)?
            .commit_from_file(path)
            .map_err(config_err)?;

        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "onnx model".to_string());

        Ok(Self {
            name,
            session: Mutex::new(session),
            sequence_input,
        })
    }
}

impl Scorer for OnnxModel {
    fn name(&self) -> &str {
        &self.name
    }

    fn score(&self, features: &[f64]) -> Result<f64, AnalysisError> {
        let infer_err = |e: ort::Error| AnalysisError::ModelInference(format!("{}: {}", self.name, e));
        let data: Vec<f32> = features.iter().map(|&x| x as f32).collect();

        let input = if self.sequence_input {
            Value::from_array(([1_usize, data.len(), 1], data)).map_err(infer_err)?
        } else {
            Value::from_array(([1_usize, data.len()], data)).map_err(infer_err)?
        };

        let mut session = self.session.lock().map_err(|_| {
            AnalysisError::ModelInference(format!("{}: session lock poisoned", self.name))
        })?;
        let outputs = session.run(ort::inputs![input]).map_err(infer_err)?;

        let (_, output) = outputs.iter().next().ok_or_else(|| {
            AnalysisError::ModelInference(format!("{}: model produced no output", self.name))
        })?;
        let (_, values) = output.try_extract_tensor::<f32>().map_err(infer_err)?;

        values.last().map(|&p| p as f64).ok_or_else(|| {
            AnalysisError::ModelInference(format!("{}: empty output tensor", self.name))
        })
    }
}
