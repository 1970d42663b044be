//! Analysis result types
//!
//! A successful analysis serializes as:
//!
//! ```json
//! {
//!   "timestamp": "2026-10-16T12:00:00.000Z",
//!   "prediction": "positive",
//!   "confidence": { "modelA": 20.0, "modelB": 80.0, "fused": 56.0 },
//!   "features": { "jitter": 0.0042, "shimmer": 0.0311, "hnr": 18.25, "pitchVariation": 0.0812 },
//!   "message": "Analysis complete"
//! }
//! ```
//!
//! and any failure as `{ "error": "<message>" }`.

use super::confidence::{round_to, ConfidenceBreakdown};
use super::metadata::AnalysisMetadata;
use crate::error::AnalysisError;
use crate::features::{Biomarker, FeatureVector};
use crate::ml::Prediction;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize, Serializer};

/// Message attached to every successful result
pub const SUCCESS_MESSAGE: &str = "Analysis complete";

/// HTTP-style status of a successful response
pub const STATUS_OK: u16 = 200;

/// HTTP-style status of any failed response
pub const STATUS_ERROR: u16 = 500;

/// Raw biomarkers as reported to callers, rounded for display
///
/// The extended fields are present only when the deployment uses the
/// extended layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SurfacedFeatures {
    /// Local jitter, 4 decimals
    pub jitter: f64,
    /// Local shimmer, 4 decimals
    pub shimmer: f64,
    /// HNR in dB, 2 decimals
    pub hnr: f64,
    /// F0 coefficient of variation, 4 decimals
    pub pitch_variation: f64,
    /// Mean F0 in Hz, 2 decimals
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mean_pitch: Option<f64>,
    /// Voiced fraction, 4 decimals
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voiced_fraction: Option<f64>,
    /// Cepstral peak prominence in dB, 2 decimals
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cpp: Option<f64>,
}

impl SurfacedFeatures {
    /// Round the raw (unscaled) vector for display
    pub fn from_vector(vector: &FeatureVector) -> Self {
        let get = |b: Biomarker| vector.get(b).map(|v| round_to(v, b.precision()));
        Self {
            jitter: get(Biomarker::Jitter).unwrap_or(f64::NAN),
            shimmer: get(Biomarker::Shimmer).unwrap_or(f64::NAN),
            hnr: get(Biomarker::Hnr).unwrap_or(f64::NAN),
            pitch_variation: get(Biomarker::PitchVariation).unwrap_or(f64::NAN),
            mean_pitch: get(Biomarker::MeanPitch),
            voiced_fraction: get(Biomarker::VoicedFraction),
            cpp: get(Biomarker::Cpp),
        }
    }
}

/// Complete analysis result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// When processing of the request began (UTC, millisecond precision)
    #[serde(serialize_with = "serialize_timestamp")]
    pub timestamp: DateTime<Utc>,

    /// Label from the fused probability
    pub prediction: Prediction,

    /// Percentages per model and fused
    pub confidence: ConfidenceBreakdown,

    /// Raw biomarkers, rounded
    pub features: SurfacedFeatures,

    /// Always [`SUCCESS_MESSAGE`]
    pub message: String,

    /// Diagnostics
    #[serde(skip)]
    pub metadata: AnalysisMetadata,
}

fn serialize_timestamp<S: Serializer>(
    timestamp: &DateTime<Utc>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&timestamp.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Transport-neutral response: a result or a single error message
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AnalysisResponse {
    /// Status 200 with the result body
    Success(AnalysisResult),
    /// Status 500 with `{ "error": message }`
    Failure {
        /// Error description
        error: String,
    },
}

impl AnalysisResponse {
    /// HTTP-style status code
    pub fn status_code(&self) -> u16 {
        match self {
            AnalysisResponse::Success(_) => STATUS_OK,
            AnalysisResponse::Failure { .. } => STATUS_ERROR,
        }
    }

    /// True for a successful analysis
    pub fn is_success(&self) -> bool {
        matches!(self, AnalysisResponse::Success(_))
    }

    /// Response body as JSON
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            serde_json::json!({ "error": format!("Failed to serialize response: {}", e) }).to_string()
        })
    }
}

impl From<Result<AnalysisResult, AnalysisError>> for AnalysisResponse {
    fn from(outcome: Result<AnalysisResult, AnalysisError>) -> Self {
        match outcome {
            Ok(result) => AnalysisResponse::Success(result),
            Err(e) => AnalysisResponse::Failure {
                error: e.to_string(),
            },
        }
    }
}
